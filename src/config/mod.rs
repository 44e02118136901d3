pub mod app_config;

pub use app_config::{
    load_env_file, AppConfig, ConfigError, LogFormat, LoggingConfig, TelegramConfig,
};
