// 配置管理
//
// 先读取可选的 JSON 配置文件，再用环境变量覆盖。

use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{default_cleaning_settings, CleaningTypeSetting, Priority, DEFAULT_FREQUENCY_DAYS};
use crate::sheets::client::DEFAULT_API_BASE;
use crate::sheets::ServiceAccountKey;

pub const ENV_SERVICE_ACCOUNT_KEY: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";
pub const ENV_SPREADSHEET_ID: &str = "GOOGLE_SPREADSHEET_ID";
const ENV_API_BASE: &str = "GOOGLE_SHEETS_API_BASE";
const ENV_BIND_ADDR: &str = "CLEANING_BIND_ADDR";
const ENV_CACHE_TTL: &str = "CLEANING_CACHE_TTL_SECS";
const ENV_UTC_OFFSET: &str = "CLEANING_UTC_OFFSET_MINUTES";
const ENV_SKILL_ID: &str = "ALEXA_SKILL_ID";
const ENV_DEFAULTS_PATH: &str = "CLEANING_DEFAULTS_PATH";
const ENV_LOG_DIR: &str = "CLEANING_LOG_DIR";

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("缺少必需的配置: {0}")]
    Missing(&'static str),

    #[error("服务账号密钥无效: {0}")]
    InvalidServiceAccount(String),

    #[error("无法读取配置文件 {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("配置值无效: {key}={value}")]
    InvalidValue { key: &'static str, value: String },
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务账号密钥（JSON 字符串）
    pub google_service_account_key: Option<String>,
    pub google_spreadsheet_id: Option<String>,
    pub sheets_api_base: String,
    pub bind_addr: String,
    /// 仪表盘缓存有效期（秒）
    pub cache_ttl_secs: u64,
    /// 固定时区偏移（分钟），未设置时使用系统本地时间
    pub utc_offset_minutes: Option<i32>,
    pub alexa_skill_id: Option<String>,
    pub defaults_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_service_account_key: None,
            google_spreadsheet_id: None,
            sheets_api_base: DEFAULT_API_BASE.to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            cache_ttl_secs: 300,
            utc_offset_minutes: None,
            alexa_skill_id: None,
            defaults_path: None,
            log_dir: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

impl AppConfig {
    /// 读取配置文件（可选）并应用环境变量
    ///
    /// `env` 用于查找环境变量，测试时可注入。
    pub async fn load<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ConfigError::Unreadable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                let config: AppConfig =
                    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Unreadable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                info!("已加载配置文件: {}", path.display());
                config
            }
            None => AppConfig::default(),
        };

        config.apply_env(env)?;
        Ok(config)
    }

    /// 从进程环境变量加载
    pub async fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(path, |key| std::env::var(key).ok()).await
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(env(key));

        if let Some(value) = get(ENV_SERVICE_ACCOUNT_KEY) {
            self.google_service_account_key = Some(value);
        }
        if let Some(value) = get(ENV_SPREADSHEET_ID) {
            self.google_spreadsheet_id = Some(value.trim().to_string());
        }
        if let Some(value) = get(ENV_API_BASE) {
            self.sheets_api_base = value;
        }
        if let Some(value) = get(ENV_BIND_ADDR) {
            self.bind_addr = value;
        }
        if let Some(value) = get(ENV_CACHE_TTL) {
            self.cache_ttl_secs = parse_value(ENV_CACHE_TTL, value)?;
        }
        if let Some(value) = get(ENV_UTC_OFFSET) {
            self.utc_offset_minutes = Some(parse_value(ENV_UTC_OFFSET, value)?);
        }
        if let Some(value) = get(ENV_SKILL_ID) {
            self.alexa_skill_id = Some(value);
        }
        if let Some(value) = get(ENV_DEFAULTS_PATH) {
            self.defaults_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// 检查必需的配置，返回第一个缺失项
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_account_key()?;
        self.spreadsheet_id()?;
        self.validate_offset()
    }

    /// 检查时区偏移（内存存储也需要）
    pub fn validate_offset(&self) -> Result<(), ConfigError> {
        match self.utc_offset_minutes {
            Some(minutes) if self.fixed_offset().is_none() => Err(ConfigError::InvalidValue {
                key: ENV_UTC_OFFSET,
                value: minutes.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// 有效范围为 ±24 小时以内
    fn fixed_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
    }

    /// 解析服务账号密钥
    pub fn service_account_key(&self) -> Result<ServiceAccountKey, ConfigError> {
        let raw = non_blank(self.google_service_account_key.clone())
            .ok_or(ConfigError::Missing(ENV_SERVICE_ACCOUNT_KEY))?;
        ServiceAccountKey::from_json(&raw)
            .map_err(|e| ConfigError::InvalidServiceAccount(e.to_string()))
    }

    pub fn spreadsheet_id(&self) -> Result<&str, ConfigError> {
        self.google_spreadsheet_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_SPREADSHEET_ID))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// 当前本地时间（配置了偏移时使用固定偏移）
    pub fn now(&self) -> NaiveDateTime {
        match self.fixed_offset() {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }

    /// 读取默认掃除種別，读取失败时使用内置列表
    pub async fn load_default_settings(&self) -> Vec<CleaningTypeSetting> {
        let Some(path) = &self.defaults_path else {
            return default_cleaning_settings();
        };

        match read_defaults_file(path).await {
            Ok(settings) if !settings.is_empty() => {
                info!("已加载默认掃除種別 {} 件: {}", settings.len(), path.display());
                settings
            }
            Ok(_) => {
                warn!("默认掃除種別文件为空，使用内置列表: {}", path.display());
                default_cleaning_settings()
            }
            Err(e) => {
                warn!("默认掃除種別读取失败，使用内置列表: {:#}", e);
                default_cleaning_settings()
            }
        }
    }
}

#[derive(Deserialize)]
struct DefaultsFile {
    cleaning_types: Vec<DefaultType>,
}

#[derive(Deserialize)]
struct DefaultType {
    name: String,
    #[serde(default = "default_frequency")]
    frequency: u32,
    #[serde(default)]
    priority: Option<Priority>,
}

fn default_frequency() -> u32 {
    DEFAULT_FREQUENCY_DAYS
}

async fn read_defaults_file(path: &Path) -> anyhow::Result<Vec<CleaningTypeSetting>> {
    let bytes = tokio::fs::read(path).await?;
    let file: DefaultsFile = serde_json::from_slice(&bytes)?;

    Ok(file
        .cleaning_types
        .into_iter()
        .filter(|t| {
            let valid = !t.name.trim().is_empty() && t.frequency > 0;
            if !valid {
                warn!("跳过无效的默认掃除種別: {:?} ({}日)", t.name, t.frequency);
            }
            valid
        })
        .map(|t| {
            CleaningTypeSetting::new(
                t.name.trim(),
                t.frequency,
                t.priority.unwrap_or(Priority::Medium),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_defaults_without_file_or_env() {
        let config = AppConfig::load(None, env_of(&[])).await.unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.sheets_api_base, DEFAULT_API_BASE);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing(ENV_SERVICE_ACCOUNT_KEY))
        ));
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"google_spreadsheet_id": "from-file", "bind_addr": "127.0.0.1:3000", "cache_ttl_secs": 60}}"#
        )
        .unwrap();

        let config = AppConfig::load(
            Some(file.path()),
            env_of(&[(ENV_SPREADSHEET_ID, "from-env"), (ENV_UTC_OFFSET, "540")]),
        )
        .await
        .unwrap();

        assert_eq!(config.spreadsheet_id().unwrap(), "from-env");
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.utc_offset_minutes, Some(540));
    }

    #[tokio::test]
    async fn test_missing_spreadsheet_reported_after_key() {
        let config = AppConfig::load(
            None,
            env_of(&[(
                ENV_SERVICE_ACCOUNT_KEY,
                r#"{"client_email": "bot@example.iam.gserviceaccount.com", "private_key": "x"}"#,
            )]),
        )
        .await
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing(ENV_SPREADSHEET_ID))
        ));
    }

    #[tokio::test]
    async fn test_invalid_values() {
        let result = AppConfig::load(None, env_of(&[(ENV_CACHE_TTL, "soon")])).await;
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let config = AppConfig::load(
            None,
            env_of(&[(ENV_SERVICE_ACCOUNT_KEY, "not json"), (ENV_SPREADSHEET_ID, "abc")]),
        )
        .await
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServiceAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("missing.json")), env_of(&[])).await;
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn test_load_default_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(
            &path,
            r#"{"cleaning_types": [
                {"name": "玄関掃除", "frequency": 10, "priority": "低"},
                {"name": "洗面台", "priority": "high"},
                {"name": "", "frequency": 3}
            ]}"#,
        )
        .unwrap();

        let config = AppConfig {
            defaults_path: Some(path),
            ..AppConfig::default()
        };
        let settings = config.load_default_settings().await;

        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0], CleaningTypeSetting::new("玄関掃除", 10, Priority::Low));
        assert_eq!(settings[1].frequency_days, DEFAULT_FREQUENCY_DAYS);
        assert_eq!(settings[1].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_load_default_settings_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            defaults_path: Some(dir.path().join("nope.json")),
            ..AppConfig::default()
        };
        assert_eq!(config.load_default_settings().await, default_cleaning_settings());
    }

    #[tokio::test]
    async fn test_out_of_range_offset_is_invalid() {
        let config = AppConfig::load(None, env_of(&[(ENV_UTC_OFFSET, "99999999")]))
            .await
            .unwrap();

        assert!(matches!(
            config.validate_offset(),
            Err(ConfigError::InvalidValue { key: ENV_UTC_OFFSET, .. })
        ));
        // 无效偏移时退回系统本地时间
        let diff = config.now() - Local::now().naive_local();
        assert!(diff.num_seconds().abs() < 5);

        let too_wide = AppConfig {
            utc_offset_minutes: Some(24 * 60),
            ..AppConfig::default()
        };
        assert!(too_wide.validate_offset().is_err());
        let jst = AppConfig {
            utc_offset_minutes: Some(540),
            ..AppConfig::default()
        };
        assert!(jst.validate_offset().is_ok());
    }

    #[test]
    fn test_now_with_fixed_offset() {
        let config = AppConfig {
            utc_offset_minutes: Some(0),
            ..AppConfig::default()
        };
        let diff = config.now() - Utc::now().naive_utc();
        assert!(diff.num_seconds().abs() < 5);
    }
}
