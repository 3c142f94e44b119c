use super::context::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("요청 본문 읽기 실패: {0}")]
    BodyRead(#[source] BoxError),

    #[error("요청 본문이 이미 소비되었습니다")]
    BodyConsumed,

    #[error("버퍼링되지 않은 요청 본문은 되감을 수 없습니다")]
    BodyNotSeekable,

    #[error("엔드포인트 {endpoint} 실행 실패: {message}")]
    Endpoint {
        endpoint: String,
        message: String,
    },

    #[error("처리 오류: {0}")]
    Processing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
