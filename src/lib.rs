//! 요청/응답 로깅 미들웨어와 이를 실행하는 hyper 기반 호스트입니다.
//!
//! # 주요 기능
//!
//! - 설정 플래그로 켜고 끄는 요청/응답 로깅
//! - 요청 본문 재읽기 (버퍼링 후 되감기)
//! - 응답 싱크 교체를 통한 응답 본문 관찰 (클라이언트로 나가는 바이트는 그대로)
//!
//! # 예제
//!
//! ```
//! use request_response_logger::middleware::{
//!     Endpoint, HttpContext, HttpRequest, MiddlewareChain, MiddlewareError,
//!     RequestBody, RequestResponseLogger,
//! };
//! use async_trait::async_trait;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Endpoint for Hello {
//!     async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
//!         ctx.response.write(b"hello").await?;
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut chain = MiddlewareChain::new();
//! chain.add(RequestResponseLogger::new(true));
//!
//! let (parts, _) = hyper::Request::get("/hello").body(()).unwrap().into_parts();
//! let mut ctx = HttpContext::new(HttpRequest::new(parts, RequestBody::empty()));
//! chain.execute(&mut ctx, &Hello).await.unwrap();
//!
//! let response = ctx.into_response().unwrap();
//! assert_eq!(response.status(), 200);
//! # });
//! ```

pub mod app;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod settings;
