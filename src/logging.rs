//! 로깅 초기화
//!
//! 전역 subscriber를 설치하지 않고 [`LogHandle`]을 명시적으로 만들어 전달합니다.
//! 프로세스 시작 시 [`init`]으로 생성하고, 종료 시 [`LogHandle::flush_and_close`]로
//! 버퍼에 남은 레코드를 내보냅니다.

use std::fs;
use std::path::Path;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::settings::{LogFormat, LogSettings};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("잘못된 로그 필터 지시자 {directive}: {message}")]
    InvalidDirective {
        directive: String,
        message: String,
    },

    #[error("로그 파일 {path} 준비 실패: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 초기화된 로깅 파이프라인에 대한 핸들
pub struct LogHandle {
    dispatch: Dispatch,
    guards: Vec<WorkerGuard>,
}

impl LogHandle {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// 비동기 writer의 버퍼를 비우고 핸들을 닫습니다.
    pub fn flush_and_close(self) {
        let Self { dispatch, guards } = self;
        drop(dispatch);
        // WorkerGuard drop 시 남은 레코드가 기록됨
        drop(guards);
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("writers", &self.guards.len())
            .finish()
    }
}

pub fn init(settings: &LogSettings) -> Result<LogHandle, LoggingError> {
    let filter = build_filter(settings)?;
    let mut guards = Vec::new();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if settings.console {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true);
        layers.push(match settings.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().flatten_event(true).boxed(),
        });
    }

    if let Some(path) = &settings.file {
        let appender = file_appender(path)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .json()
                .flatten_event(true)
                .boxed(),
        );
    }

    let subscriber = Registry::default().with(layers).with(filter);
    Ok(LogHandle {
        dispatch: Dispatch::new(subscriber),
        guards,
    })
}

fn build_filter(settings: &LogSettings) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(settings.level).into())
        .from_env_lossy();

    for directive in &settings.directives {
        let parsed = directive.parse().map_err(|e: tracing_subscriber::filter::ParseError| {
            LoggingError::InvalidDirective {
                directive: directive.clone(),
                message: e.to_string(),
            }
        })?;
        filter = filter.add_directive(parsed);
    }

    Ok(filter)
}

fn file_appender(path: &str) -> Result<tracing_appender::rolling::RollingFileAppender, LoggingError> {
    let path_ref = Path::new(path);
    let file_name = path_ref
        .file_name()
        .ok_or_else(|| LoggingError::File {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "파일 이름이 없습니다"),
        })?;
    let directory = match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    fs::create_dir_all(&directory).map_err(|e| LoggingError::File {
        path: path.to_string(),
        source: e,
    })?;

    Ok(tracing_appender::rolling::never(directory, file_name))
}
