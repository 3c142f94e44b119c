use serde::Deserialize;
use std::env;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// 바인딩 주소 (기본값: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP 포트 (기본값: 8080)
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_http_port() -> u16 { 8080 }

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    const MIN_PORT: u16 = 1;

    fn parse_port(name: &str, value: &str) -> Result<u16, SettingsError> {
        let port = value.parse::<u16>().map_err(|_| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: value.to_string(),
            reason: format!("포트는 {}-{} 범위여야 합니다", Self::MIN_PORT, u16::MAX),
        })?;

        if port < Self::MIN_PORT {
            return Err(SettingsError::EnvVarInvalid {
                var_name: name.to_string(),
                value: value.to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }

        Ok(port)
    }

    /// 환경 변수로 기존 값을 덮어씁니다.
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        if let Ok(port) = env::var("APP_HTTP_PORT") {
            self.port = Self::parse_port("APP_HTTP_PORT", &port)?;
        }
        self.host = parse_env_var("APP_HOST", || self.host.clone())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.port < Self::MIN_PORT {
            return Err(SettingsError::InvalidConfig(
                "포트는 0이 될 수 없습니다".to_string()
            ));
        }
        if self.host.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "바인딩 주소가 비어 있습니다".to_string()
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}
