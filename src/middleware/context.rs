//! 파이프라인 컨텍스트
//!
//! 요청 하나에 대한 요청/응답 상태를 담습니다. 호스트가 소유하고 각 미들웨어에는
//! `&mut HttpContext`로 빌려줍니다.

use std::any::Any;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Empty, Full};
use hyper::body::Body;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{http::request::Parts, Method, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::MiddlewareError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 미들웨어가 응답 싱크를 대체할 때 사용하는 메모리 버퍼 (탐색 및 재읽기 가능)
pub type ResponseBuffer = Cursor<Vec<u8>>;

/// 응답 바이트가 기록되는 출력 싱크
pub trait ResponseSink: AsyncWrite + Send + Unpin + 'static {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T> ResponseSink for T
where
    T: AsyncWrite + Send + Unpin + 'static,
{
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// 호스트의 쓰기 전용 싱크
///
/// 클라이언트로 나갈 바이트를 모읍니다. 읽기 API가 없으므로 미들웨어는 이 싱크에서
/// 응답 본문을 관찰할 수 없습니다.
#[derive(Debug, Default)]
pub struct ClientSink {
    data: BytesMut,
}

impl ClientSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}

impl AsyncWrite for ClientSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

enum BodyState {
    Streaming(UnsyncBoxBody<Bytes, BoxError>),
    Buffered(Bytes),
    Consumed,
}

/// 요청 본문
///
/// 스트리밍 본문은 한 번만 읽을 수 있습니다. [`RequestBody::enable_buffering`]을
/// 호출하면 메모리에 모아 여러 번 읽을 수 있게 됩니다.
pub struct RequestBody {
    state: BodyState,
    position: usize,
}

impl RequestBody {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// 이미 메모리에 있는 본문 (버퍼링된 상태)
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            state: BodyState::Buffered(data.into()),
            position: 0,
        }
    }

    pub fn streaming<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            state: BodyState::Streaming(body.map_err(Into::into).boxed_unsync()),
            position: 0,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.state, BodyState::Buffered(_))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// 스트리밍 본문을 메모리에 모아 재읽기를 가능하게 합니다.
    ///
    /// 이미 버퍼링된 본문에는 아무 일도 하지 않습니다.
    pub async fn enable_buffering(&mut self) -> Result<(), MiddlewareError> {
        match std::mem::replace(&mut self.state, BodyState::Consumed) {
            BodyState::Streaming(body) => {
                let collected = body.collect().await.map_err(MiddlewareError::BodyRead)?;
                self.state = BodyState::Buffered(collected.to_bytes());
                self.position = 0;
                Ok(())
            }
            BodyState::Buffered(data) => {
                self.state = BodyState::Buffered(data);
                Ok(())
            }
            BodyState::Consumed => Err(MiddlewareError::BodyConsumed),
        }
    }

    /// 현재 위치부터 끝까지 읽습니다.
    pub async fn read_to_end(&mut self) -> Result<Bytes, MiddlewareError> {
        match std::mem::replace(&mut self.state, BodyState::Consumed) {
            BodyState::Streaming(body) => {
                // 버퍼링되지 않은 스트림은 읽는 순간 소비됨
                let collected = body.collect().await.map_err(MiddlewareError::BodyRead)?;
                Ok(collected.to_bytes())
            }
            BodyState::Buffered(data) => {
                let start = self.position.min(data.len());
                let rest = data.slice(start..);
                self.position = data.len();
                self.state = BodyState::Buffered(data);
                Ok(rest)
            }
            BodyState::Consumed => Err(MiddlewareError::BodyConsumed),
        }
    }

    /// 현재 위치부터 끝까지 텍스트로 읽습니다. 잘못된 UTF-8은 대체 문자로 바뀝니다.
    pub async fn read_to_string(&mut self) -> Result<String, MiddlewareError> {
        let bytes = self.read_to_end().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// 읽기 위치를 처음으로 되돌립니다.
    pub fn rewind(&mut self) -> Result<(), MiddlewareError> {
        match self.state {
            BodyState::Buffered(_) => {
                self.position = 0;
                Ok(())
            }
            _ => Err(MiddlewareError::BodyNotSeekable),
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            BodyState::Streaming(_) => "streaming".to_string(),
            BodyState::Buffered(data) => format!("buffered({} bytes)", data.len()),
            BodyState::Consumed => "consumed".to_string(),
        };
        f.debug_struct("RequestBody")
            .field("state", &state)
            .field("position", &self.position)
            .finish()
    }
}

#[derive(Debug)]
pub struct HttpRequest {
    parts: Parts,
    scheme: String,
    body: RequestBody,
}

impl HttpRequest {
    pub fn new(parts: Parts, body: RequestBody) -> Self {
        let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
        Self { parts, scheme, body }
    }

    pub fn from_hyper<B>(req: hyper::Request<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self::new(parts, RequestBody::streaming(body))
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// `?a=1` 형태의 쿼리 문자열. 쿼리가 없으면 빈 문자열입니다.
    pub fn query_string(&self) -> String {
        match self.parts.uri.query() {
            Some(query) if !query.is_empty() => format!("?{}", query),
            _ => String::new(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host 헤더, 없으면 URI authority
    pub fn host(&self) -> String {
        self.parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| self.parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }
}

pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    sink: Box<dyn ResponseSink>,
}

impl HttpResponse {
    pub fn new(sink: Box<dyn ResponseSink>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            sink,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn set_content_type(&mut self, content_type: HeaderValue) {
        self.headers.insert(header::CONTENT_TYPE, content_type);
    }

    pub fn sink_mut(&mut self) -> &mut Box<dyn ResponseSink> {
        &mut self.sink
    }

    /// 출력 싱크를 교체하고 이전 싱크를 돌려줍니다.
    pub fn replace_sink(&mut self, sink: Box<dyn ResponseSink>) -> Box<dyn ResponseSink> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// 본문 바이트를 현재 싱크에 씁니다.
    pub async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.sink.write_all(data).await
    }

    /// 응답을 상태, 헤더, 구체 타입 싱크로 분해합니다. 싱크 타입이 다르면 `None`.
    pub fn take_sink_as<T: Any>(self) -> Option<(StatusCode, HeaderMap, T)> {
        let Self { status, headers, sink } = self;
        let sink = sink.into_any().downcast::<T>().ok()?;
        Some((status, headers, *sink))
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct HttpContext {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

impl HttpContext {
    /// 호스트 싱크([`ClientSink`])를 가진 컨텍스트를 만듭니다.
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::new(Box::new(ClientSink::new())),
        }
    }

    /// 파이프라인 종료 후 클라이언트로 보낼 hyper 응답을 만듭니다.
    pub fn into_response(self) -> Result<hyper::Response<Full<Bytes>>, MiddlewareError> {
        let (status, headers, sink) = self
            .response
            .take_sink_as::<ClientSink>()
            .ok_or_else(|| MiddlewareError::Processing("응답 싱크가 복원되지 않았습니다".to_string()))?;

        let mut response = hyper::Response::new(Full::new(sink.into_bytes()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// 테스트와 내부 호출을 위한 빈 본문 요청
pub fn empty_request(method: Method, uri: &str) -> Result<HttpRequest, MiddlewareError> {
    let req = hyper::Request::builder()
        .method(method)
        .uri(uri)
        .body(Empty::<Bytes>::new())
        .map_err(|e| MiddlewareError::Processing(e.to_string()))?;
    let (parts, _) = req.into_parts();
    Ok(HttpRequest::new(parts, RequestBody::empty()))
}
