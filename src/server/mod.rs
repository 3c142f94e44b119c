pub mod error;
pub mod handler;
pub mod listener;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::app::AppEndpoint;
use crate::middleware::{Endpoint, MiddlewareChain, RequestResponseLogger};
use crate::settings::Settings;

pub use error::Error;
pub use handler::RequestHandler;
pub use listener::ServerListener;

pub type Result<T> = std::result::Result<T, Error>;

/// 설정으로부터 기본 미들웨어 체인을 구성합니다.
pub fn build_middleware_chain(settings: &Settings) -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    let logger = RequestResponseLogger::from_settings(settings);
    info!(enabled = logger.is_enabled(), "요청/응답 로깅 미들웨어 구성");
    chain.add(logger);
    chain
}

pub struct Server {
    listener: ServerListener,
    handler: Arc<RequestHandler>,
}

impl Server {
    /// 데모 애플리케이션 엔드포인트로 서버를 준비합니다.
    pub async fn bind(settings: &Settings) -> Result<Self> {
        Self::bind_with_endpoint(settings, Arc::new(AppEndpoint::new())).await
    }

    pub async fn bind_with_endpoint(settings: &Settings, endpoint: Arc<dyn Endpoint>) -> Result<Self> {
        let listener = ServerListener::bind(&settings.server).await?;
        let handler = Arc::new(RequestHandler::new(build_middleware_chain(settings), endpoint));
        Ok(Self { listener, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.listener.run(self.handler, shutdown).await
    }
}
