//! HTTP TTS Client - 调用外部 TTS HTTP 服务
//!
//! 实现 SynthesisProvider trait
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/synthesize
//! Request: {"text": "...", "voice_id": "...", "language": "en", "voice_description": "..."}
//! Response: 音频二进制，元数据在 headers 中
//! - `X-TTS-Format`: wav / mp3 / ogg（缺省时从 Content-Type 推断）
//! - `X-TTS-Word-Timestamps`: JSON 数组 `[{"text","start","end"}]`（可选）

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::application::ports::{
    ProviderError, SynthesisProvider, SynthesisRequest, SynthesisResponse,
};
use crate::domain::book::TimestampItem;

/// TTS 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_description: Option<&'a str>,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// 注册名称
    pub name: String,
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            name: "http".to_string(),
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
    closed: AtomicBool,
}

impl HttpTtsClient {
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            closed: AtomicBool::new(false),
        })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/api/tts/synthesize", self.config.base_url.trim_end_matches('/'))
    }
}

/// Content-Type → 格式标记
fn format_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" | "audio/opus" => Some("ogg"),
        "audio/flac" => Some("flac"),
        _ => None,
    }
}

/// 解析 `X-TTS-Word-Timestamps` header
fn parse_word_timestamps(raw: &str) -> Result<Vec<TimestampItem>, ProviderError> {
    serde_json::from_str(raw)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad word timestamps: {}", e)))
}

#[async_trait]
impl SynthesisProvider for HttpTtsClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisResponse, ProviderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProviderError::Closed(self.config.name.clone()));
        }

        let body = TtsHttpRequest {
            text: &request.text,
            voice_id: &request.voice_id,
            language: &request.language,
            voice_description: request.voice_description.as_deref(),
        };

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            "Sending TTS synthesize request"
        );

        let response = self
            .client
            .post(self.synthesize_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else if e.is_connect() {
                    ProviderError::Network(format!("Cannot connect to TTS service: {}", e))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service(format!("HTTP {}: {}", status, error_text)));
        }

        // 从 headers 提取元数据
        let headers = response.headers();
        let format = headers
            .get("X-TTS-Format")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .or_else(|| {
                headers
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(format_from_content_type)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "wav".to_string());
        let word_timestamps = match headers
            .get("X-TTS-Word-Timestamps")
            .and_then(|v| v.to_str().ok())
        {
            Some(raw) => Some(parse_word_timestamps(raw)?),
            None => None,
        };

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse("empty audio body".to_string()));
        }

        tracing::debug!(
            format = %format,
            audio_size = audio.len(),
            words = word_timestamps.as_ref().map(Vec::len),
            "TTS synthesis completed"
        );

        Ok(SynthesisResponse {
            audio,
            format,
            word_timestamps,
        })
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(name = %self.config.name, "HttpTtsClient closed");
        }
        Ok(())
    }
}
