//! HTTP OCR Client - 调用外部文字提取服务
//!
//! POST {base_url}/api/ocr/extract
//! Request: multipart/form-data，`image` 为图片二进制，`language` 可选
//! Response: {"text": "...", "confidence": 0.93}

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::application::ports::{
    ExtractionProvider, ExtractionRequest, ExtractionResult, ProviderError,
};

#[derive(Debug, Deserialize)]
struct OcrHttpResponse {
    text: String,
    #[serde(default)]
    confidence: f32,
}

/// HTTP OCR 客户端配置
#[derive(Debug, Clone)]
pub struct HttpOcrClientConfig {
    pub name: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpOcrClientConfig {
    fn default() -> Self {
        Self {
            name: "http-ocr".to_string(),
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 60,
        }
    }
}

impl HttpOcrClientConfig {
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

/// HTTP OCR 客户端
pub struct HttpOcrClient {
    client: Client,
    config: HttpOcrClientConfig,
    closed: AtomicBool,
}

impl HttpOcrClient {
    pub fn new(config: HttpOcrClientConfig) -> Result<Self, ProviderError> {
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

    fn extract_url(&self) -> String {
        format!("{}/api/ocr/extract", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ExtractionProvider for HttpOcrClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ProviderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProviderError::Closed(self.config.name.clone()));
        }

        let mut form = Form::new().part("image", Part::bytes(request.image).file_name("page"));
        if let Some(language) = request.language {
            form = form.text("language", language);
        }

        let response = self
            .client
            .post(self.extract_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service(format!("HTTP {}: {}", status, error_text)));
        }

        let body: OcrHttpResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            text_len = body.text.len(),
            confidence = body.confidence,
            "OCR extraction completed"
        );

        Ok(ExtractionResult {
            text: body.text,
            confidence: body.confidence.clamp(0.0, 1.0),
        })
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(name = %self.config.name, "HttpOcrClient closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url() {
        let client = HttpOcrClient::new(HttpOcrClientConfig::new("http://ocr:9000/")).unwrap();
        assert_eq!(client.extract_url(), "http://ocr:9000/api/ocr/extract");
        assert_eq!(client.name(), "http-ocr");
    }

    #[test]
    fn test_response_confidence_defaults() {
        let body: OcrHttpResponse = serde_json::from_str(r#"{"text":"page one"}"#).unwrap();
        assert_eq!(body.text, "page one");
        assert_eq!(body.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let client = HttpOcrClient::new(HttpOcrClientConfig::default()).unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();

        let result = client
            .extract(ExtractionRequest {
                image: vec![0u8; 4],
                language: None,
            })
            .await;
        assert!(matches!(result, Err(ProviderError::Closed(_))));
    }
}
