pub mod settings;

pub use settings::{
    CacheBackendKind, CacheConfig, EngineConfig, LoggingConfig, ServerConfig, SessionConfig,
    Settings,
};
