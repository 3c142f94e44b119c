use std::io::SeekFrom;
use std::ops::{Deref, DerefMut};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::middleware::{HttpContext, MiddlewareError, ResponseBuffer, ResponseSink};

/// 응답 싱크를 메모리 버퍼로 바꿔 두는 스코프
///
/// [`CaptureScope::finish`]가 호출되지 않은 채 drop되면(취소, panic) 원래 싱크를
/// 되돌리고 버퍼를 버립니다. 어떤 경로로 끝나도 원래 싱크가 비어 있는 일은 없습니다.
pub(crate) struct CaptureScope<'a> {
    ctx: &'a mut HttpContext,
    original: Option<Box<dyn ResponseSink>>,
}

/// 버퍼에서 읽은 응답 본문
pub(crate) struct CapturedBody {
    pub text: String,
    pub len: usize,
}

/// 캡처가 끝난 응답 버퍼
///
/// 원래 싱크는 이미 복원된 상태입니다. [`CapturedResponse::copy_to`]를 호출하기
/// 전까지 클라이언트 싱크에는 아무것도 기록되지 않습니다.
pub(crate) struct CapturedResponse {
    buffer: Option<ResponseBuffer>,
    pub body: Option<CapturedBody>,
}

impl<'a> CaptureScope<'a> {
    pub fn begin(ctx: &'a mut HttpContext) -> Self {
        let original = ctx.response.replace_sink(Box::new(ResponseBuffer::default()));
        Self {
            ctx,
            original: Some(original),
        }
    }

    /// 원래 싱크를 복원하고 버퍼 내용을 읽습니다. 버퍼는 처음으로 되감긴 채 돌려줍니다.
    ///
    /// 본문 텍스트를 읽지 못하면 `body`가 `None`이지만 버퍼는 그대로 복사할 수 있습니다.
    pub async fn finish(mut self) -> CapturedResponse {
        let Some(original) = self.original.take() else {
            return CapturedResponse { buffer: None, body: None };
        };
        let sink = self.ctx.response.replace_sink(original);

        let mut buffer = match sink.into_any().downcast::<ResponseBuffer>() {
            Ok(buffer) => *buffer,
            Err(_) => {
                warn!("하위 파이프라인이 응답 싱크를 교체하여 응답 본문을 캡처할 수 없습니다");
                return CapturedResponse { buffer: None, body: None };
            }
        };

        let body = match read_buffer(&mut buffer).await {
            Ok(text) => Some(CapturedBody {
                len: buffer.get_ref().len(),
                text,
            }),
            Err(e) => {
                warn!(error = %e, "응답 버퍼 읽기 실패");
                None
            }
        };
        buffer.set_position(0);

        CapturedResponse {
            buffer: Some(buffer),
            body,
        }
    }
}

impl CapturedResponse {
    /// 버퍼 전체를 원래 싱크로 복사하고 flush합니다.
    pub async fn copy_to(self, ctx: &mut HttpContext) -> Result<(), MiddlewareError> {
        let Some(mut buffer) = self.buffer else {
            return Ok(());
        };
        let sink = ctx.response.sink_mut();
        tokio::io::copy(&mut buffer, sink).await?;
        sink.flush().await?;
        Ok(())
    }
}

async fn read_buffer(buffer: &mut ResponseBuffer) -> std::io::Result<String> {
    buffer.seek(SeekFrom::Start(0)).await?;
    let mut bytes = Vec::with_capacity(buffer.get_ref().len());
    buffer.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl Deref for CaptureScope<'_> {
    type Target = HttpContext;

    fn deref(&self) -> &HttpContext {
        self.ctx
    }
}

impl DerefMut for CaptureScope<'_> {
    fn deref_mut(&mut self) -> &mut HttpContext {
        self.ctx
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            let abandoned = self.ctx.response.replace_sink(original);
            drop(abandoned);
            debug!("응답 캡처가 완료되지 않아 원래 싱크를 복원했습니다");
        }
    }
}
