//! Fake TTS Client - 用于开发与测试的合成供应商
//!
//! 不调用外部服务：按词数生成静音 WAV，并给出等间隔的词级时间戳

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::application::ports::{
    ProviderError, SynthesisProvider, SynthesisRequest, SynthesisResponse,
};
use crate::domain::book::TimestampItem;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 注册名称
    pub name: String,
    /// 每个词的时长（秒）
    pub seconds_per_word: f64,
    /// 采样率
    pub sample_rate: u32,
    /// 模拟推理延迟（毫秒）
    pub latency_ms: u64,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            name: "fake".to_string(),
            seconds_per_word: 0.25,
            sample_rate: 16000,
            latency_ms: 0,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    closed: AtomicBool,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            name = %config.name,
            seconds_per_word = config.seconds_per_word,
            sample_rate = config.sample_rate,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    fn word_timestamps(&self, text: &str) -> Vec<TimestampItem> {
        let step = self.config.seconds_per_word;
        text.split_whitespace()
            .enumerate()
            .map(|(i, word)| TimestampItem {
                text: word.to_string(),
                start: i as f64 * step,
                end: (i + 1) as f64 * step,
            })
            .collect()
    }
}

/// 生成 16-bit 单声道静音 WAV
fn silent_wav(sample_rate: u32, seconds: f64) -> Vec<u8> {
    let samples = (sample_rate as f64 * seconds).round() as u32;
    let data_len = samples * 2;
    let byte_rate = sample_rate * 2;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

#[async_trait]
impl SynthesisProvider for FakeTtsClient {
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

        tracing::debug!(
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            "FakeTtsClient: generating silent audio"
        );

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let words = self.word_timestamps(&request.text);
        let seconds = words.last().map(|w| w.end).unwrap_or(0.0);

        Ok(SynthesisResponse {
            audio: silent_wav(self.config.sample_rate, seconds),
            format: "wav".to_string(),
            word_timestamps: Some(words),
        })
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice_id: "v1".to_string(),
            language: "en".to_string(),
            voice_description: None,
        }
    }

    #[tokio::test]
    async fn test_fake_returns_wav_and_word_timestamps() {
        let client = FakeTtsClient::with_defaults();
        let response = client.synthesize(request("call me Ishmael")).await.unwrap();

        assert_eq!(response.format, "wav");
        assert_eq!(&response.audio[0..4], b"RIFF");
        assert_eq!(&response.audio[8..12], b"WAVE");
        // 3 words * 0.25s * 16000 Hz * 2 bytes
        assert_eq!(response.audio.len(), 44 + 24000);

        let words = response.word_timestamps.unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[2].text, "Ishmael");
        assert_eq!(words[2].start, 0.5);
        assert_eq!(words[2].end, 0.75);
    }

    #[tokio::test]
    async fn test_fake_close_is_idempotent() {
        let client = FakeTtsClient::with_defaults();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(matches!(
            client.synthesize(request("x")).await,
            Err(ProviderError::Closed(_))
        ));
    }
}
