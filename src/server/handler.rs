use std::sync::Arc;
use hyper::{Request, Response};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use crate::middleware::{
    handle_middleware_error, Endpoint, HttpContext, HttpRequest, MiddlewareChain,
};
use tracing::{debug, error};

pub struct RequestHandler {
    middleware_chain: MiddlewareChain,
    endpoint: Arc<dyn Endpoint>,
}

impl RequestHandler {
    pub fn new(middleware_chain: MiddlewareChain, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            middleware_chain,
            endpoint,
        }
    }

    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
        Ok(self.dispatch(HttpRequest::from_hyper(req)).await)
    }

    /// 파이프라인을 실행하고 컨텍스트를 hyper 응답으로 변환합니다.
    pub async fn dispatch(&self, request: HttpRequest) -> Response<Full<Bytes>> {
        let mut ctx = HttpContext::new(request);
        debug!(
            method = %ctx.request.method(),
            path = %ctx.request.path(),
            middlewares = ?self.middleware_chain.names(),
            "파이프라인 실행 시작"
        );

        if let Err(e) = self.middleware_chain.execute(&mut ctx, self.endpoint.as_ref()).await {
            error!(error = %e, "요청 처리 실패");
            return handle_middleware_error(&e);
        }

        match ctx.into_response() {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "응답 생성 실패");
                handle_middleware_error(&e)
            }
        }
    }

    pub async fn handle_connection<I>(&self, io: I) -> std::result::Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin,
    {
        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(|req| self.handle_request(req)),
            )
            .await
    }
}
