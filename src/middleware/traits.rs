use super::{HttpContext, MiddlewareError, Next};
use async_trait::async_trait;

/// 미들웨어 트레이트
///
/// 요청을 관찰하거나 수정한 뒤 `next`로 나머지 파이프라인을 실행하고,
/// 돌아온 뒤 응답을 다룹니다.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 미들웨어의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>) -> Result<(), MiddlewareError>;
}

/// 파이프라인의 마지막에서 실제 응답을 만드는 애플리케이션 로직
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError>;
}
