//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, StorageBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "BOOKVOX";

/// 加载应用配置
///
/// # 环境变量示例
/// - `BOOKVOX_SERVER__PORT=8080`
/// - `BOOKVOX_STORAGE__BACKEND=sled`
/// - `BOOKVOX_PIPELINE__WORKER_POOL_SIZE=4`
/// - `BOOKVOX_TTS__URL=http://tts-server:8000`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索当前目录下的 config / config.local
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5060)?
        .set_default("storage.backend", "local")?
        .set_default("storage.root", "data/books")?
        .set_default("storage.sled_path", "data/objects.sled")?
        .set_default("storage.bucket", "bookvox")?
        .set_default("pipeline.worker_pool_size", 3)?
        .set_default("pipeline.max_retries", 2)?
        .set_default("pipeline.retry_backoff_ms", 500)?
        .set_default("pipeline.context_paragraphs", 2)?
        .set_default("pipeline.default_synthesis_provider", "fake")?
        .set_default("pipeline.default_segmentation_provider", "rule-based")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("tts.fake_enabled", true)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），层级分隔符为双下划线
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    match config.storage.backend {
        StorageBackend::Local if config.storage.root.as_os_str().is_empty() => {
            return Err(ConfigError::ValidationError(
                "Storage root cannot be empty".to_string(),
            ));
        }
        StorageBackend::Sled if config.storage.sled_path.is_empty() => {
            return Err(ConfigError::ValidationError(
                "Sled path cannot be empty".to_string(),
            ));
        }
        _ => {}
    }

    if config.pipeline.worker_pool_size == 0 {
        return Err(ConfigError::ValidationError(
            "Worker pool size must be at least 1".to_string(),
        ));
    }

    if config.pipeline.default_synthesis_provider.is_empty() {
        return Err(ConfigError::ValidationError(
            "Default synthesis provider cannot be empty".to_string(),
        ));
    }

    if matches!(config.tts.url.as_deref(), Some("")) {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Storage Backend: {:?}", config.storage.backend);
    match config.storage.backend {
        StorageBackend::Local => tracing::info!("Storage Root: {:?}", config.storage.root),
        StorageBackend::Sled => tracing::info!(
            "Sled Path: {} (bucket {})",
            config.storage.sled_path,
            config.storage.bucket
        ),
    }
    tracing::info!(
        "Pipeline: workers={}, retries={}, backoff={}ms, context={}",
        config.pipeline.worker_pool_size,
        config.pipeline.max_retries,
        config.pipeline.retry_backoff_ms,
        config.pipeline.context_paragraphs
    );
    tracing::info!(
        "TTS URL: {}",
        config.tts.url.as_deref().unwrap_or("(disabled)")
    );
    tracing::info!(
        "OCR URL: {}",
        config.ocr.url.as_deref().unwrap_or("(disabled)")
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
