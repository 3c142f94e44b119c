use hyper::{header, Response, StatusCode};
use http_body_util::Full;
use bytes::Bytes;
use super::MiddlewareError;

/// 미들웨어 에러를 HTTP 응답으로 변환합니다.
pub fn handle_middleware_error(err: &MiddlewareError) -> Response<Full<Bytes>> {
    let status = match err {
        MiddlewareError::BodyRead(_) => StatusCode::BAD_REQUEST,
        MiddlewareError::BodyConsumed
        | MiddlewareError::BodyNotSeekable
        | MiddlewareError::Endpoint { .. }
        | MiddlewareError::Processing(_)
        | MiddlewareError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(err.to_string())))
        .unwrap_or_else(|_| {
            Response::new(Full::new(Bytes::from("Internal Server Error")))
        })
}
