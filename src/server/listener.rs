use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use hyper_util::rt::TokioIo;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info};
use crate::settings::ServerSettings;
use super::handler::RequestHandler;
use super::Result;

pub struct ServerListener {
    http_listener: TcpListener,
}

impl ServerListener {
    pub async fn bind(settings: &ServerSettings) -> Result<Self> {
        let address = settings.bind_address();
        let http_listener = TcpListener::bind(&address)
            .await
            .map_err(|e| {
                error!(error = %e, address = %address, "HTTP 포트 바인딩 실패");
                e
            })?;

        info!(address = %http_listener.local_addr()?, "HTTP 리스너 시작");
        Ok(Self { http_listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    /// `shutdown`이 완료될 때까지 연결을 수락합니다.
    ///
    /// 각 연결 태스크에는 현재 dispatcher가 전달됩니다.
    pub async fn run<F>(self, handler: Arc<RequestHandler>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("종료 신호 수신, 리스너 중지");
                    return Ok(());
                }

                result = self.http_listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(peer = %peer, "연결 수락");
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                if let Err(err) = handler.handle_connection(io).await {
                                    error!(error = %err, "HTTP 연결 처리 실패");
                                }
                            }.with_current_subscriber());
                        }
                        Err(e) => {
                            error!(error = %e, "HTTP 연결 수락 실패");
                        }
                    }
                }
            }
        }
    }
}
