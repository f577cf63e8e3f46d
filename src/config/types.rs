//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// TTS 供应商配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// OCR 供应商配置
    #[serde(default)]
    pub ocr: OcrConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL（用于生成音频播放地址）
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,

    /// 上传文件最大大小（字节）
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

fn default_max_upload_size() -> usize {
    50 * 1024 * 1024 // 50 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 本地文件系统
    #[default]
    Local,
    /// 嵌入式对象存储（sled）
    Sled,
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// 本地存储根目录
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// sled 数据库路径
    #[serde(default = "default_sled_path")]
    pub sled_path: String,

    /// sled bucket 名称
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/books")
}

fn default_sled_path() -> String {
    "data/objects.sled".to_string()
}

fn default_bucket() -> String {
    "bookvox".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            sled_path: default_sled_path(),
            bucket: default_bucket(),
        }
    }
}

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 合成并发 worker 数
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// 单片段最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 首次重试退避（毫秒），之后翻倍
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// 分段时前后文段落数
    #[serde(default = "default_context_paragraphs")]
    pub context_paragraphs: usize,

    /// 未指定时使用的合成供应商
    #[serde(default = "default_synthesis_provider")]
    pub default_synthesis_provider: String,

    /// 未指定时使用的分段供应商
    #[serde(default = "default_segmentation_provider")]
    pub default_segmentation_provider: String,
}

fn default_worker_pool_size() -> usize {
    3
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_context_paragraphs() -> usize {
    2
}

fn default_synthesis_provider() -> String {
    "fake".to_string()
}

fn default_segmentation_provider() -> String {
    "rule-based".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            context_paragraphs: default_context_paragraphs(),
            default_synthesis_provider: default_synthesis_provider(),
            default_segmentation_provider: default_segmentation_provider(),
        }
    }
}

impl PipelineConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// TTS 供应商配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// HTTP TTS 服务地址，未设置时不注册 HTTP 供应商
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP 供应商注册名
    #[serde(default = "default_tts_name")]
    pub name: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 是否注册 fake 供应商
    #[serde(default = "default_fake_enabled")]
    pub fake_enabled: bool,
}

fn default_tts_name() -> String {
    "http".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_fake_enabled() -> bool {
    true
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: default_tts_name(),
            timeout_secs: default_tts_timeout(),
            fake_enabled: default_fake_enabled(),
        }
    }
}

/// OCR 供应商配置
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// OCR 服务地址，未设置时不注册
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_ocr_name")]
    pub name: String,

    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

fn default_ocr_name() -> String {
    "http-ocr".to_string()
}

fn default_ocr_timeout() -> u64 {
    60
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: default_ocr_name(),
            timeout_secs: default_ocr_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5060);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.pipeline.worker_pool_size, 3);
        assert_eq!(config.pipeline.max_retries, 2);
        assert!(config.tts.url.is_none());
        assert!(config.tts.fake_enabled);
    }

    #[test]
    fn test_server_urls() {
        let mut config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5060");
        assert_eq!(config.public_base_url(), "http://localhost:5060");

        config.base_url = Some("https://books.example.com".to_string());
        assert_eq!(config.public_base_url(), "https://books.example.com");
    }

    #[test]
    fn test_retry_backoff() {
        let config = PipelineConfig {
            retry_backoff_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.retry_backoff(), Duration::from_millis(250));
    }
}
