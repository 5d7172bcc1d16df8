use anyhow::Result;
use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Env var that points at an alternative settings file (without extension).
pub const CONFIG_PATH_ENV: &str = "CHAT_GATEWAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/settings";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub engine: EngineConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    pub key_prefix: String,
    pub default_ttl_seconds: u64,
    pub operation_timeout_ms: u64,
    pub default_list_limit: usize,
    pub max_list_limit: usize,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(1))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub answer_path: String,
    pub timeout_seconds: u64,
    pub max_concurrency: usize,
    pub acquire_timeout_ms: u64,
    /// Most recent messages forwarded with each question (0 = whole history).
    pub history_limit: usize,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn answer_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.answer_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub default_session_id: String,
    /// Record the exchange in session history when the answer came from cache.
    pub append_on_cache_hit: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = Self::builder_with_defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Built-in defaults only, no file or environment sources.
    pub fn defaults() -> Result<Self> {
        let settings: Settings = Self::builder_with_defaults()?.build()?.try_deserialize()?;
        Ok(settings)
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("cache.backend", "redis")?
            .set_default("cache.redis_url", "redis://127.0.0.1:6379/0")?
            .set_default("cache.key_prefix", "chat-gateway:answer:")?
            .set_default("cache.default_ttl_seconds", 1800)?
            .set_default("cache.operation_timeout_ms", 5000)?
            .set_default("cache.default_list_limit", 50)?
            .set_default("cache.max_list_limit", 1000)?
            .set_default("engine.base_url", "http://127.0.0.1:8080")?
            .set_default("engine.answer_path", "/answer")?
            .set_default("engine.timeout_seconds", 60)?
            .set_default("engine.max_concurrency", 16)?
            .set_default("engine.acquire_timeout_ms", 5000)?
            .set_default("engine.history_limit", 20)?
            .set_default("session.default_session_id", "default")?
            .set_default("session.append_on_cache_hit", true)?
            .set_default("logging.file_prefix", "chat-gateway.log")?;
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.server.port, 5001);
        assert_eq!(settings.cache.backend, CacheBackendKind::Redis);
        assert_eq!(settings.cache.default_ttl_seconds, 1800);
        assert_eq!(settings.cache.default_list_limit, 50);
        assert_eq!(settings.session.default_session_id, "default");
        assert!(settings.session.append_on_cache_hit);
        assert!(settings.logging.directory.is_none());
    }

    #[test]
    fn test_answer_url_joins_slashes() {
        let mut settings = Settings::defaults().unwrap();
        settings.engine.base_url = "http://engine:9000/".to_string();
        settings.engine.answer_path = "/v1/answer".to_string();

        assert_eq!(settings.engine.answer_url(), "http://engine:9000/v1/answer");
    }

    #[test]
    fn test_durations_never_zero() {
        let mut settings = Settings::defaults().unwrap();
        settings.cache.default_ttl_seconds = 0;
        settings.engine.timeout_seconds = 0;

        assert_eq!(settings.cache.default_ttl(), Duration::from_secs(1));
        assert_eq!(settings.engine.timeout(), Duration::from_secs(1));
    }

    // Only test in this crate that touches the process environment.
    #[test]
    fn test_load_honors_env_overrides() {
        std::env::set_var(CONFIG_PATH_ENV, "does/not/exist/settings");
        std::env::set_var("APP__CACHE__BACKEND", "memory");
        std::env::set_var("APP__ENGINE__HISTORY_LIMIT", "6");
        std::env::set_var("APP__SERVER__PORT", "6123");

        let settings = Settings::load().unwrap();

        std::env::remove_var("APP__CACHE__BACKEND");
        std::env::remove_var("APP__ENGINE__HISTORY_LIMIT");
        std::env::remove_var("APP__SERVER__PORT");
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
        assert_eq!(settings.engine.history_limit, 6);
        assert_eq!(settings.server.port, 6123);
        assert_eq!(settings.cache.default_ttl_seconds, 1800);
    }
}
