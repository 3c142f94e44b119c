use super::{Endpoint, HttpContext, Middleware, MiddlewareError};

/// 남은 파이프라인에 대한 continuation
pub struct Next<'a> {
    middlewares: &'a [Box<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Box<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { middlewares, endpoint }
    }

    /// 다음 미들웨어를, 남은 것이 없으면 엔드포인트를 실행합니다.
    pub async fn run(self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        match self.middlewares.split_first() {
            Some((middleware, rest)) => {
                middleware.handle(ctx, Next::new(rest, self.endpoint)).await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}

#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new()
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// 등록 순서대로 미들웨어를 거쳐 엔드포인트까지 실행합니다.
    pub async fn execute(
        &self,
        ctx: &mut HttpContext,
        endpoint: &dyn Endpoint,
    ) -> Result<(), MiddlewareError> {
        Next::new(&self.middlewares, endpoint).run(ctx).await
    }
}
