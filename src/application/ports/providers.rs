//! Provider Ports - 外部能力抽象
//!
//! 三类能力，各自一个 trait：
//! - 分段（LLM 角色切分）
//! - 语音合成（TTS）
//! - 文字提取（OCR）
//!
//! 具体实现在 infrastructure/adapters 层，由 ProviderRegistry 按名称选取

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::book::TimestampItem;

/// 供应商错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider closed: {0}")]
    Closed(String),
}

// ============================================================================
// Segmentation
// ============================================================================

/// 分段请求
#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    pub text: String,
    /// 前文段落（由远到近）
    pub preceding: Vec<String>,
    /// 后文段落（由近到远）
    pub following: Vec<String>,
    pub language: Option<String>,
}

/// 分段结果中的一个片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDraft {
    pub text: String,
    pub person: String,
    pub language: String,
    pub voice_description: String,
}

#[async_trait]
pub trait SegmentationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 写入 Segment.processing.segmenter_version
    fn version(&self) -> &str {
        "1"
    }

    async fn segment(&self, request: SegmentationRequest)
        -> Result<Vec<SegmentDraft>, ProviderError>;

    /// 释放资源，可重复调用
    async fn close(&self) -> Result<(), ProviderError>;
}

// ============================================================================
// Synthesis
// ============================================================================

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    /// 已解析的供应商音色
    pub voice_id: String,
    pub language: String,
    pub voice_description: Option<String>,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    pub audio: Vec<u8>,
    /// 文件扩展名形式的格式标记（wav / mp3 / ogg ...）
    pub format: String,
    /// 词级时间戳（秒）
    pub word_timestamps: Option<Vec<TimestampItem>>,
}

#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, request: SynthesisRequest)
        -> Result<SynthesisResponse, ProviderError>;

    /// 释放资源，可重复调用
    async fn close(&self) -> Result<(), ProviderError>;
}

// ============================================================================
// Extraction
// ============================================================================

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub image: Vec<u8>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    /// 0.0 ~ 1.0
    pub confidence: f32,
}

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, request: ExtractionRequest)
        -> Result<ExtractionResult, ProviderError>;

    /// 释放资源，可重复调用
    async fn close(&self) -> Result<(), ProviderError>;
}
