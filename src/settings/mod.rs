use std::{env, path::Path};
use serde::Deserialize;

mod server;
pub mod logging;
mod error;

pub use server::ServerSettings;
pub use logging::{LogFormat, LogSettings};
pub use error::SettingsError;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::parse_env_var;

/// 요청/응답 로깅 활성화 환경 변수
pub const ENABLE_LOGGING_ENV: &str = "APP_ENABLE_REQUEST_RESPONSE_LOGGING";

/// TOML 파일 키
pub const ENABLE_LOGGING_KEY: &str = "EnableRequestResponseLogging";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    // 서버 설정
    pub server: ServerSettings,

    // 로깅 설정
    pub logging: LogSettings,

    /// 요청/응답 로깅 미들웨어 활성화 여부 (기본값: false)
    pub enable_request_response_logging: bool,

    /// 로깅 초기화 전에 발생한 비치명적 설정 경고
    pub diagnostics: Vec<String>,
}

/// TOML 파일의 원본 형태. 플래그는 해석 전 값 그대로 받습니다.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    server: ServerSettings,

    #[serde(default)]
    logging: LogSettings,

    #[serde(
        default,
        rename = "EnableRequestResponseLogging",
        alias = "enable_request_response_logging"
    )]
    enable_request_response_logging: Option<FlagValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
    Other(toml::Value),
}

impl From<SettingsFile> for Settings {
    fn from(file: SettingsFile) -> Self {
        let mut settings = Settings {
            server: file.server,
            logging: file.logging,
            ..Default::default()
        };

        match file.enable_request_response_logging {
            None => {}
            Some(FlagValue::Bool(value)) => settings.enable_request_response_logging = value,
            Some(FlagValue::Text(text)) => match parse_flag(&text) {
                Some(value) => settings.enable_request_response_logging = value,
                None => settings.diagnostics.push(unreadable_flag(ENABLE_LOGGING_KEY, &text)),
            },
            Some(FlagValue::Other(value)) => {
                settings.diagnostics.push(unreadable_flag(ENABLE_LOGGING_KEY, &value.to_string()));
            }
        }
        settings
    }
}

fn unreadable_flag(source: &str, value: &str) -> String {
    format!(
        "{} 값 '{}'을(를) 해석할 수 없어 요청/응답 로깅을 비활성화합니다",
        source, value
    )
}

impl Settings {
    /// 기본값 → TOML 파일(`APP_CONFIG_FILE`) → 환경 변수 순서로 설정을 쌓아 올립니다.
    pub async fn load() -> Result<Self> {
        let mut settings = match env::var("APP_CONFIG_FILE") {
            Ok(config_path) => Self::from_toml_file(&config_path).await?,
            Err(_) => Self::default(),
        };

        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| SettingsError::ParseError { source: e })?;
        Ok(file.into())
    }

    /// 환경 변수만으로 설정을 생성합니다.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.server.apply_env()?;
        self.logging.apply_env()?;

        // 플래그 읽기 실패는 치명적이지 않음: 비활성화로 처리
        match env::var(ENABLE_LOGGING_ENV) {
            Ok(value) => match parse_flag(&value) {
                Some(enabled) => self.enable_request_response_logging = enabled,
                None => {
                    self.enable_request_response_logging = false;
                    self.diagnostics.push(unreadable_flag(ENABLE_LOGGING_ENV, &value));
                }
            },
            Err(env::VarError::NotPresent) => {}
            Err(e) => {
                self.enable_request_response_logging = false;
                self.diagnostics.push(format!(
                    "{} 읽기 실패 ({}), 요청/응답 로깅을 비활성화합니다",
                    ENABLE_LOGGING_ENV, e
                ));
            }
        }
        Ok(())
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
