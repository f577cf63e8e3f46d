//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::{ProviderNames, SegmentBookResponse};
use crate::domain::book::{BookStatus, PersonVoice};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Book DTOs
// ============================================================================

/// 上传响应：立即返回 book_id，解析在后台进行
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub title: String,
    pub orig_format: String,
    pub status: BookStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct SegmentRequest {
    /// 分段供应商，缺省使用配置中的默认值
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub book_id: String,
    pub total_segments: usize,
}

impl From<SegmentBookResponse> for SegmentResponse {
    fn from(r: SegmentBookResponse) -> Self {
        Self {
            book_id: r.book_id,
            total_segments: r.total_segments,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoiceMapRequest {
    pub voices: Vec<PersonVoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub provider: Option<String>,
    /// 续跑：跳过已完成的片段
    #[serde(default)]
    pub resume: bool,
}

/// 合成已在后台启动
#[derive(Debug, Serialize)]
pub struct SynthesizeAccepted {
    pub book_id: String,
    pub provider: String,
    pub resume: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub after: Option<String>,
}

// ============================================================================
// Provider DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    #[serde(flatten)]
    pub providers: ProviderNames,
    /// 支持的文档格式
    pub formats: Vec<String>,
    pub default_synthesis: String,
    pub default_segmentation: String,
}

// ============================================================================
// WebSocket
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    /// 只接收该书的事件
    #[serde(default)]
    pub book_id: Option<String>,
}
