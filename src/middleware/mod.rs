pub mod chain;
pub mod context;
pub mod error;
pub mod request_response_logger;
pub mod response;
pub mod traits;

pub use chain::{MiddlewareChain, Next};
pub use context::{
    ClientSink, HttpContext, HttpRequest, HttpResponse, RequestBody, ResponseBuffer, ResponseSink,
};
pub use error::MiddlewareError;
pub use request_response_logger::{RequestResponseLogger, LOG_TARGET};
pub use response::handle_middleware_error;
pub use traits::{Endpoint, Middleware};
