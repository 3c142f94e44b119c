//! 데모 애플리케이션 엔드포인트
//!
//! | Method | Path | 응답 |
//! |---|---|---|
//! | `GET` | `/health` | `200 ok` |
//! | `POST` | `/echo` | 요청 본문과 Content-Type을 그대로 반환 |
//! | 그 외 | | `404 Not Found` |

use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use tracing::debug;

use crate::middleware::{Endpoint, HttpContext, MiddlewareError};

#[derive(Debug, Clone, Copy, Default)]
pub struct AppEndpoint;

impl AppEndpoint {
    pub fn new() -> Self {
        Self
    }

    async fn health(ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        ctx.response.set_content_type(HeaderValue::from_static("text/plain; charset=utf-8"));
        ctx.response.write(b"ok").await?;
        Ok(())
    }

    async fn echo(ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        let body = ctx.request.body_mut().read_to_end().await?;
        let content_type = ctx
            .request
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

        ctx.response.set_content_type(content_type);
        ctx.response.write(&body).await?;
        Ok(())
    }

    async fn not_found(ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        ctx.response.set_status(StatusCode::NOT_FOUND);
        ctx.response.set_content_type(HeaderValue::from_static("text/plain; charset=utf-8"));
        ctx.response.write(b"Not Found").await?;
        Ok(())
    }
}

#[async_trait]
impl Endpoint for AppEndpoint {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        let route = (ctx.request.method().clone(), ctx.request.path().to_string());
        debug!(method = %route.0, path = %route.1, "엔드포인트 라우팅");

        match (route.0, route.1.as_str()) {
            (Method::GET, "/health") => Self::health(ctx).await,
            (Method::POST, "/echo") => Self::echo(ctx).await,
            _ => Self::not_found(ctx).await,
        }
    }
}
