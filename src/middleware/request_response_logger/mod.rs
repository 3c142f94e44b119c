//! 요청/응답 로깅 미들웨어
//!
//! 요청 본문을 버퍼링해 읽은 뒤 되감고, 응답 싱크를 메모리 버퍼로 바꿔 하위
//! 파이프라인이 쓴 본문을 관찰한 다음 원래 싱크로 복사합니다.

mod capture;
mod headers;
mod middleware;

pub use headers::{format_header_groups, format_headers};
pub use middleware::{RequestResponseLogger, LOG_TARGET};
