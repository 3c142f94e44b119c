use serde::{Deserialize, Deserializer};
use std::env;
use tracing::Level;
use super::{server::parse_env_var, SettingsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// 로그 출력 설정
///
/// 콘솔과 파일을 동시에 사용할 수 있습니다. 파일 출력은 항상 줄 단위 JSON입니다.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: Level,
    /// 콘솔 출력 형식
    pub format: LogFormat,
    pub console: bool,
    pub file: Option<String>,
    /// 추가 EnvFilter 지시자 (예: `hyper=warn`)
    pub directives: Vec<String>,
}

impl LogSettings {
    /// 환경 변수로 기존 값을 덮어씁니다.
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        if let Ok(level) = env::var("APP_LOG_LEVEL") {
            self.level = parse_log_level(&level).ok_or_else(|| SettingsError::EnvVarInvalid {
                var_name: "APP_LOG_LEVEL".to_string(),
                value: level.clone(),
                reason: "유효하지 않은 로그 레벨".to_string(),
            })?;
        }
        self.format = parse_env_var("APP_LOG_FORMAT", || self.format)?;
        self.console = parse_env_var("APP_LOG_CONSOLE", || self.console)?;
        match env::var("APP_LOG_FILE") {
            Ok(path) if path.trim().is_empty() => self.file = None,
            Ok(path) => self.file = Some(path),
            Err(env::VarError::NotPresent) => {}
            Err(e) => {
                return Err(SettingsError::EnvVarInvalid {
                    var_name: "APP_LOG_FILE".to_string(),
                    value: "".to_string(),
                    reason: e.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.console && self.file.is_none() {
            return Err(SettingsError::InvalidConfig(
                "콘솔과 파일 로그 출력이 모두 비활성화되어 있습니다".to_string()
            ));
        }
        Ok(())
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            console: true,
            file: None,
            directives: default_directives(),
        }
    }
}

pub(crate) fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn default_directives() -> Vec<String> {
    vec!["hyper=warn".to_string()]
}

impl<'de> Deserialize<'de> for LogSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default = "default_log_level_string")]
            level: String,
            #[serde(default)]
            format: LogFormat,
            #[serde(default = "default_console")]
            console: bool,
            #[serde(default)]
            file: Option<String>,
            #[serde(default = "default_directives")]
            directives: Vec<String>,
        }

        let helper = Helper::deserialize(deserializer)?;
        let level = parse_log_level(&helper.level).ok_or_else(|| {
            serde::de::Error::custom(format!("유효하지 않은 로그 레벨: {}", helper.level))
        })?;

        Ok(LogSettings {
            level,
            format: helper.format,
            console: helper.console,
            file: helper.file,
            directives: helper.directives,
        })
    }
}

fn default_log_level_string() -> String {
    "info".to_string()
}

fn default_console() -> bool {
    true
}
