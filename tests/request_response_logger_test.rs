mod common;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use common::LogCapture;
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use request_response_logger::middleware::{
    Endpoint, HttpContext, HttpRequest, MiddlewareChain, MiddlewareError, RequestBody,
    RequestResponseLogger, LOG_TARGET,
};

/// 요청 본문과 Content-Type을 그대로 돌려주는 엔드포인트
struct EchoEndpoint;

#[async_trait]
impl Endpoint for EchoEndpoint {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        let body = ctx.request.body_mut().read_to_end().await?;
        if let Some(content_type) = ctx.request.headers().get(header::CONTENT_TYPE).cloned() {
            ctx.response.set_content_type(content_type);
        }
        ctx.response
            .headers_mut()
            .insert("x-echo", HeaderValue::from_static("1"));
        ctx.response.write(&body).await?;
        Ok(())
    }
}

struct FixedEndpoint {
    status: StatusCode,
    body: &'static [u8],
}

#[async_trait]
impl Endpoint for FixedEndpoint {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        ctx.response.set_status(self.status);
        ctx.response.set_content_type(HeaderValue::from_static("text/plain"));
        ctx.response.write(self.body).await?;
        Ok(())
    }
}

/// 일부를 쓴 뒤 실패하는 엔드포인트
struct FailingEndpoint;

#[async_trait]
impl Endpoint for FailingEndpoint {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        ctx.response.write(b"partial").await?;
        Err(MiddlewareError::Endpoint {
            endpoint: "failing".to_string(),
            message: "database unavailable".to_string(),
        })
    }
}

/// 응답 일부를 쓰고 영원히 끝나지 않는 엔드포인트
struct StalledEndpoint;

#[async_trait]
impl Endpoint for StalledEndpoint {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        ctx.response.write(b"never delivered").await?;
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// 첫 쓰기 시점에 이미 남아 있던 응답 레코드 수를 기억하는 클라이언트 싱크
struct RecordingSink {
    capture: LogCapture,
    records_at_first_write: Arc<Mutex<Option<usize>>>,
    data: Arc<Mutex<Vec<u8>>>,
}

impl tokio::io::AsyncWrite for RecordingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let mut first = self.records_at_first_write.lock().unwrap();
        if first.is_none() {
            *first = Some(self.capture.response_records().len());
        }
        self.data.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// 모든 쓰기가 실패하는 클라이언트 싱크 (연결이 끊긴 클라이언트)
struct BrokenSink;

impl tokio::io::AsyncWrite for BrokenSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "client disconnected",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn chain(enabled: bool) -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    chain.add(RequestResponseLogger::new(enabled));
    chain
}

fn request(method: Method, uri: &str, headers: &[(&str, &str)], body: RequestBody) -> HttpRequest {
    let mut builder = hyper::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    HttpRequest::new(parts, body)
}

fn streaming(data: &'static str) -> RequestBody {
    RequestBody::streaming(Full::new(Bytes::from_static(data.as_bytes())))
}

async fn into_parts(ctx: HttpContext) -> (StatusCode, hyper::HeaderMap, Bytes) {
    let response = ctx.into_response().unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

#[tokio::test]
async fn test_disabled_logger_is_transparent_and_silent() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());
    let endpoint = FixedEndpoint { status: StatusCode::OK, body: b"ok" };

    let mut with_logger = HttpContext::new(request(Method::GET, "/", &[], streaming("")));
    chain(false).execute(&mut with_logger, &endpoint).await.unwrap();

    let mut without_logger = HttpContext::new(request(Method::GET, "/", &[], streaming("")));
    MiddlewareChain::new().execute(&mut without_logger, &endpoint).await.unwrap();

    assert_eq!(into_parts(with_logger).await, into_parts(without_logger).await);
    assert!(capture.request_records().is_empty());
    assert!(capture.response_records().is_empty());
}

#[tokio::test]
async fn test_disabled_logger_does_not_buffer_request_body() {
    struct InspectEndpoint;

    #[async_trait]
    impl Endpoint for InspectEndpoint {
        async fn call(&self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
            assert!(!ctx.request.body().is_buffered());
            Ok(())
        }
    }

    let mut ctx = HttpContext::new(request(Method::POST, "/", &[], streaming("data")));
    chain(false).execute(&mut ctx, &InspectEndpoint).await.unwrap();
}

#[tokio::test]
async fn test_enabled_logger_delivers_downstream_bytes() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());
    let endpoint = FixedEndpoint { status: StatusCode::OK, body: b"ok" };

    let mut ctx = HttpContext::new(request(Method::GET, "/status", &[], streaming("")));
    chain(true).execute(&mut ctx, &endpoint).await.unwrap();

    let (status, headers, body) = into_parts(ctx).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body, Bytes::from_static(b"ok"));

    let requests = capture.request_records();
    let responses = capture.response_records();
    assert_eq!(requests.len(), 1);
    assert_eq!(responses.len(), 1);
    assert_eq!(requests[0]["request_id"], responses[0]["request_id"]);
    assert_eq!(responses[0]["status_code"], 200);
    assert_eq!(responses[0]["content_type"], "text/plain");
    assert_eq!(responses[0]["headers"], "{content-type: text/plain}");
    assert_eq!(responses[0]["body"], "ok");
    assert_eq!(responses[0]["level"], "INFO");
}

#[tokio::test]
async fn test_request_record_fields() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let req = request(
        Method::POST,
        "/orders?expand=items",
        &[("host", "shop.example"), ("x-foo", "1"), ("x-foo", "2"), ("x-bar", "3")],
        streaming("{\"a\":1}"),
    );
    let mut ctx = HttpContext::new(req);
    chain(true).execute(&mut ctx, &EchoEndpoint).await.unwrap();

    let requests = capture.request_records();
    assert_eq!(requests.len(), 1);
    let record = &requests[0];
    assert_eq!(record["method"], "POST");
    assert_eq!(record["path"], "/orders");
    assert_eq!(record["query_string"], "?expand=items");
    assert_eq!(record["headers"], "{host: shop.example}, {x-foo: 1, 2}, {x-bar: 3}");
    assert_eq!(record["scheme"], "http");
    assert_eq!(record["host"], "shop.example");
    assert_eq!(record["body"], "{\"a\":1}");
}

#[tokio::test]
async fn test_downstream_reads_request_body_unchanged() {
    let mut ctx = HttpContext::new(request(
        Method::POST,
        "/echo",
        &[("content-type", "application/json")],
        streaming("{\"a\":1}"),
    ));
    chain(true).execute(&mut ctx, &EchoEndpoint).await.unwrap();

    let (status, headers, body) = into_parts(ctx).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers["x-echo"], "1");
    assert_eq!(body, Bytes::from_static(b"{\"a\":1}"));
}

#[tokio::test]
async fn test_non_utf8_response_is_delivered_byte_for_byte() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());
    let endpoint = FixedEndpoint { status: StatusCode::OK, body: &[0x00, 0xff, 0x10, b'a'] };

    let mut ctx = HttpContext::new(request(Method::GET, "/blob", &[], streaming("")));
    chain(true).execute(&mut ctx, &endpoint).await.unwrap();

    let (_, _, body) = into_parts(ctx).await;
    assert_eq!(body.as_ref(), &[0x00, 0xff, 0x10, b'a']);

    let responses = capture.response_records();
    assert_eq!(responses[0]["body_length"], 4);
}

#[tokio::test]
async fn test_stacked_loggers_stay_transparent() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let mut stacked = MiddlewareChain::new();
    stacked.add(RequestResponseLogger::new(true));
    stacked.add(RequestResponseLogger::new(true));

    let mut ctx = HttpContext::new(request(Method::POST, "/echo", &[], streaming("twice")));
    stacked.execute(&mut ctx, &EchoEndpoint).await.unwrap();

    let (_, _, body) = into_parts(ctx).await;
    assert_eq!(body, Bytes::from_static(b"twice"));

    let requests = capture.request_records();
    let responses = capture.response_records();
    assert_eq!(requests.len(), 2);
    assert_eq!(responses.len(), 2);
    assert!(requests.iter().all(|r| r["body"] == "twice"));
    assert!(responses.iter().all(|r| r["body"] == "twice"));
}

#[tokio::test]
async fn test_downstream_error_propagates_after_flush() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let mut ctx = HttpContext::new(request(Method::GET, "/fail", &[], streaming("")));
    let err = chain(true).execute(&mut ctx, &FailingEndpoint).await.unwrap_err();

    match err {
        MiddlewareError::Endpoint { endpoint, message } => {
            assert_eq!(endpoint, "failing");
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }

    // 부분 응답이 원래 싱크로 복사됨
    let (_, _, body) = into_parts(ctx).await;
    assert_eq!(body, Bytes::from_static(b"partial"));

    let responses = capture.response_records();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["level"], "WARN");
    assert_eq!(responses[0]["body"], "partial");
    assert!(responses[0]["error"].as_str().unwrap().contains("database unavailable"));
}

#[tokio::test]
async fn test_response_record_precedes_client_write() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let records_at_first_write = Arc::new(Mutex::new(None));
    let data = Arc::new(Mutex::new(Vec::new()));
    let mut ctx = HttpContext::new(request(Method::GET, "/", &[], streaming("")));
    let _client = ctx.response.replace_sink(Box::new(RecordingSink {
        capture: capture.clone(),
        records_at_first_write: records_at_first_write.clone(),
        data: data.clone(),
    }));

    let endpoint = FixedEndpoint { status: StatusCode::OK, body: b"ordered" };
    chain(true).execute(&mut ctx, &endpoint).await.unwrap();

    assert_eq!(*records_at_first_write.lock().unwrap(), Some(1));
    assert_eq!(data.lock().unwrap().as_slice(), b"ordered");

    let responses = capture.response_records();
    assert_eq!(responses[0]["target"], LOG_TARGET);
    assert_eq!(capture.request_records()[0]["target"], LOG_TARGET);
}

#[tokio::test]
async fn test_client_write_failure_keeps_logged_body() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let mut ctx = HttpContext::new(request(Method::GET, "/", &[], streaming("")));
    let _client = ctx.response.replace_sink(Box::new(BrokenSink));

    let endpoint = FixedEndpoint { status: StatusCode::OK, body: b"ok" };
    let err = chain(true).execute(&mut ctx, &endpoint).await.unwrap_err();
    assert!(matches!(err, MiddlewareError::Io(_)));

    let responses = capture.response_records();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["level"], "INFO");
    assert_eq!(responses[0]["body"], "ok");
    assert_eq!(responses[0]["body_length"], 2);

    let copy_failures = capture.with_message("응답 본문을 클라이언트 싱크로 복사하지 못했습니다");
    assert_eq!(copy_failures.len(), 1);
    assert_eq!(copy_failures[0]["level"], "WARN");
    assert_eq!(copy_failures[0]["request_id"], responses[0]["request_id"]);
    assert!(copy_failures[0]["error"].as_str().unwrap().contains("client disconnected"));
}

#[tokio::test]
async fn test_request_body_read_failure_propagates() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
        Ok(Frame::data(Bytes::from_static(b"{\"a\":"))),
        Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "client went away")),
    ];
    let body = RequestBody::streaming(StreamBody::new(futures_util::stream::iter(frames)));
    let mut ctx = HttpContext::new(request(Method::POST, "/echo", &[], body));

    let err = chain(true).execute(&mut ctx, &EchoEndpoint).await.unwrap_err();
    assert!(matches!(err, MiddlewareError::BodyRead(_)));
    assert!(capture.request_records().is_empty());
    assert!(capture.response_records().is_empty());
}

#[tokio::test]
async fn test_cancelled_request_restores_client_sink() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());

    let chain = chain(true);
    let mut ctx = HttpContext::new(request(Method::GET, "/slow", &[], streaming("")));
    let outcome = chain.execute(&mut ctx, &StalledEndpoint).now_or_never();
    assert!(outcome.is_none());

    // 취소 후에도 원래 싱크가 복원되어 있고 버퍼 내용은 버려짐
    let (_, _, body) = into_parts(ctx).await;
    assert!(body.is_empty());
    assert_eq!(capture.request_records().len(), 1);
    assert!(capture.response_records().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_do_not_bleed() {
    let capture = LogCapture::new();
    let _guard = tracing::dispatcher::set_default(&capture.dispatch());
    let chain = chain(true);

    let requests = (0..100).map(|i| {
        let chain = &chain;
        async move {
            let body = format!("payload-{i}");
            let req = request(
                Method::POST,
                &format!("/echo/{i}"),
                &[],
                RequestBody::streaming(Full::new(Bytes::from(body.clone()))),
            );
            let mut ctx = HttpContext::new(req);
            chain.execute(&mut ctx, &EchoEndpoint).await.unwrap();
            let (_, _, delivered) = into_parts(ctx).await;
            assert_eq!(delivered, Bytes::from(body));
        }
    });
    futures_util::future::join_all(requests).await;

    let request_records = capture.request_records();
    let response_records = capture.response_records();
    assert_eq!(request_records.len(), 100);
    assert_eq!(response_records.len(), 100);

    let responses_by_id: HashMap<String, &serde_json::Value> = response_records
        .iter()
        .map(|r| (r["request_id"].as_str().unwrap().to_string(), r))
        .collect();
    assert_eq!(responses_by_id.len(), 100);

    for record in &request_records {
        let id = record["request_id"].as_str().unwrap();
        let response = responses_by_id[id];
        let path = record["path"].as_str().unwrap();
        let index = path.trim_start_matches("/echo/");
        assert_eq!(record["body"], format!("payload-{index}"));
        assert_eq!(response["body"], format!("payload-{index}"));
    }
}
