use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::capture::CaptureScope;
use super::headers::format_headers;
use crate::middleware::{HttpContext, HttpRequest, Middleware, MiddlewareError, Next};
use crate::settings::Settings;

/// 요청/응답 레코드의 tracing target
pub const LOG_TARGET: &str = "request_response_logger";

/// 요청/응답 로깅 미들웨어
///
/// 활성화되면 요청마다 두 개의 레코드를 남깁니다: 하위 파이프라인 실행 전 요청 정보,
/// 실행 후 응답 정보. 클라이언트로 나가는 바이트는 바꾸지 않습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestResponseLogger {
    enabled: bool,
}

impl RequestResponseLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.enable_request_response_logging)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// 본문을 끝까지 읽고 다음 소비자를 위해 위치를 처음으로 되돌립니다.
async fn read_body_from_request(request: &mut HttpRequest) -> Result<String, MiddlewareError> {
    let body = request.body_mut();
    body.enable_buffering().await?;
    let text = body.read_to_string().await?;
    body.rewind()?;
    Ok(text)
}

#[async_trait]
impl Middleware for RequestResponseLogger {
    fn name(&self) -> &str {
        "request-response-logger"
    }

    async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>) -> Result<(), MiddlewareError> {
        if !self.enabled {
            return next.run(ctx).await;
        }

        let request_id = Uuid::new_v4().to_string();
        let body = read_body_from_request(&mut ctx.request).await?;
        {
            let request = &ctx.request;
            info!(
                target: LOG_TARGET,
                request_id = %request_id,
                method = %request.method(),
                path = %request.path(),
                query_string = %request.query_string(),
                headers = %format_headers(request.headers()),
                scheme = %request.scheme(),
                host = %request.host(),
                body = %body,
                "HTTP request information"
            );
        }

        let mut scope = CaptureScope::begin(ctx);
        let result = next.run(&mut scope).await;
        let captured = scope.finish().await;

        {
            let response = &ctx.response;
            let body = captured.body.as_ref().map(|c| c.text.as_str()).unwrap_or_default();
            let body_length = captured.body.as_ref().map(|c| c.len).unwrap_or_default();
            let content_type = response.content_type().unwrap_or_default();

            match &result {
                Ok(()) => info!(
                    target: LOG_TARGET,
                    request_id = %request_id,
                    status_code = response.status().as_u16(),
                    content_type = %content_type,
                    headers = %format_headers(response.headers()),
                    body = %body,
                    body_length,
                    "HTTP response information"
                ),
                Err(e) => warn!(
                    target: LOG_TARGET,
                    request_id = %request_id,
                    status_code = response.status().as_u16(),
                    content_type = %content_type,
                    headers = %format_headers(response.headers()),
                    body = %body,
                    body_length,
                    error = %e,
                    "HTTP response information"
                ),
            }
        }

        // 레코드를 남긴 뒤에 클라이언트로 복사
        let copied = captured.copy_to(ctx).await;
        if let Err(e) = &copied {
            warn!(
                target: LOG_TARGET,
                request_id = %request_id,
                error = %e,
                "응답 본문을 클라이언트 싱크로 복사하지 못했습니다"
            );
        }

        // 하위 파이프라인 에러가 우선, 그다음 복사 실패
        result?;
        copied
    }
}
