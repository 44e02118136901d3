use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::monitoring::RuleSet;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_WATCH_FILES: &str = "/var/log/important/ssh-success.log,/var/log/important/auth.log";
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE_NAME: &str = "ssh-alert.log";

/// Load `.env` into the process environment.
///
/// `ENV_FILE` points at an explicit file; otherwise `.env` is searched from the
/// current directory upwards. A missing file is not an error.
pub fn load_env_file() {
    match env::var("ENV_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            if let Err(e) = dotenvy::from_path(&path) {
                eprintln!("Failed to load env file {}: {}", path, e);
            }
        }
        _ => {
            dotenvy::dotenv().ok();
        }
    }
}

/// Delivery endpoint settings
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub watch_files: Vec<PathBuf>,
    pub rule_set: RuleSet,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value lookup
    ///
    /// Blank values are treated the same as absent ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::MissingVar("BOT_TOKEN"))?;
        let chat_id = get("CHAT_ID").ok_or(ConfigError::MissingVar("CHAT_ID"))?;
        let api_base = get("API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = match get("DELIVERY_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => DEFAULT_DELIVERY_TIMEOUT_SECS,
        };

        let watch_files: Vec<PathBuf> = get("WATCH_FILES")
            .unwrap_or_else(|| DEFAULT_WATCH_FILES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();

        if watch_files.is_empty() {
            return Err(ConfigError::NoWatchFiles);
        }

        let rule_set = match get("RULE_SET") {
            Some(raw) => raw
                .parse::<RuleSet>()
                .map_err(|_| ConfigError::InvalidRuleSet(raw))?,
            None => RuleSet::default(),
        };

        Ok(Self {
            telegram: TelegramConfig {
                bot_token,
                chat_id,
                api_base,
                timeout: Duration::from_secs(timeout_secs),
            },
            watch_files,
            rule_set,
        })
    }
}

/// Operational log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Operational log sink settings
///
/// Never fails: anything unparsable falls back to its default so logging can
/// come up before the rest of the configuration is validated.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub file_name: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let format = match get("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            file_name: get("LOG_FILE_NAME").unwrap_or(defaults.file_name),
            format,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
    #[error("Invalid RULE_SET value: {0} (expected 'syslog' or 'forwarded')")]
    InvalidRuleSet(String),
    #[error("Invalid DELIVERY_TIMEOUT_SECS value: {0}")]
    InvalidTimeout(String),
    #[error("WATCH_FILES does not name any file")]
    NoWatchFiles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn should_load_required_values_with_defaults() {
        // Arrange
        let lookup = lookup_from(&[("BOT_TOKEN", "123:abc"), ("CHAT_ID", "-1001")]);

        // Act
        let config = AppConfig::from_lookup(lookup).expect("config should load");

        // Assert
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.chat_id, "-1001");
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.timeout, Duration::from_secs(10));
        assert_eq!(config.rule_set, RuleSet::Syslog);
        assert_eq!(
            config.watch_files,
            vec![
                PathBuf::from("/var/log/important/ssh-success.log"),
                PathBuf::from("/var/log/important/auth.log"),
            ]
        );
    }

    #[test]
    fn should_fail_when_bot_token_missing() {
        let lookup = lookup_from(&[("CHAT_ID", "-1001")]);

        let result = AppConfig::from_lookup(lookup);

        assert_eq!(result.unwrap_err(), ConfigError::MissingVar("BOT_TOKEN"));
    }

    #[test]
    fn should_treat_blank_chat_id_as_missing() {
        let lookup = lookup_from(&[("BOT_TOKEN", "123:abc"), ("CHAT_ID", "   ")]);

        let result = AppConfig::from_lookup(lookup);

        assert_eq!(result.unwrap_err(), ConfigError::MissingVar("CHAT_ID"));
    }

    #[test]
    fn should_parse_optional_overrides() {
        // Arrange
        let lookup = lookup_from(&[
            ("BOT_TOKEN", "t"),
            ("CHAT_ID", "c"),
            ("API_BASE", "http://localhost:8081/"),
            ("WATCH_FILES", "/tmp/a.log, /tmp/b.log ,"),
            ("RULE_SET", "Forwarded"),
            ("DELIVERY_TIMEOUT_SECS", "3"),
        ]);

        // Act
        let config = AppConfig::from_lookup(lookup).expect("config should load");

        // Assert
        assert_eq!(config.telegram.api_base, "http://localhost:8081");
        assert_eq!(
            config.watch_files,
            vec![PathBuf::from("/tmp/a.log"), PathBuf::from("/tmp/b.log")]
        );
        assert_eq!(config.rule_set, RuleSet::Forwarded);
        assert_eq!(config.telegram.timeout, Duration::from_secs(3));
    }

    #[test]
    fn should_reject_invalid_values() {
        let bad_rules = lookup_from(&[("BOT_TOKEN", "t"), ("CHAT_ID", "c"), ("RULE_SET", "xml")]);
        assert_eq!(
            AppConfig::from_lookup(bad_rules).unwrap_err(),
            ConfigError::InvalidRuleSet("xml".to_string())
        );

        let zero_timeout = lookup_from(&[
            ("BOT_TOKEN", "t"),
            ("CHAT_ID", "c"),
            ("DELIVERY_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(
            AppConfig::from_lookup(zero_timeout).unwrap_err(),
            ConfigError::InvalidTimeout("0".to_string())
        );

        let no_files = lookup_from(&[("BOT_TOKEN", "t"), ("CHAT_ID", "c"), ("WATCH_FILES", " , ")]);
        assert_eq!(
            AppConfig::from_lookup(no_files).unwrap_err(),
            ConfigError::NoWatchFiles
        );
    }

    #[test]
    fn should_fall_back_to_logging_defaults() {
        let config = LoggingConfig::from_lookup(lookup_from(&[("LOG_FORMAT", "yaml")]));

        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.file_name, "ssh-alert.log");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn should_read_logging_overrides() {
        let config = LoggingConfig::from_lookup(lookup_from(&[
            ("LOG_DIR", "/var/log/important"),
            ("LOG_FILE_NAME", "forwarder.log"),
            ("LOG_FORMAT", "JSON"),
        ]));

        assert_eq!(config.log_dir, PathBuf::from("/var/log/important"));
        assert_eq!(config.file_name, "forwarder.log");
        assert_eq!(config.format, LogFormat::Json);
    }
}
