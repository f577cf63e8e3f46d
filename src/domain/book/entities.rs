//! Book Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 章节
///
/// 不变量:
/// - 只属于一本书（book_id）
/// - number 决定阅读顺序
/// - 分段阶段消费后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub book_id: String,
    pub number: usize,
    pub title: String,
    /// 目录面包屑，如 ["Part I", "Chapter 3"]
    #[serde(default)]
    pub toc_path: Vec<String>,
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

impl Chapter {
    pub fn new(book_id: impl Into<String>, number: usize, title: impl Into<String>) -> Self {
        Self {
            id: chapter_id(number),
            book_id: book_id.into(),
            number,
            title: title.into(),
            toc_path: Vec::new(),
            paragraphs: Vec::new(),
        }
    }

    pub fn with_toc_path(mut self, toc_path: Vec<String>) -> Self {
        self.toc_path = toc_path;
        self
    }

    pub fn with_paragraphs(mut self, paragraphs: Vec<String>) -> Self {
        self.paragraphs = paragraphs;
        self
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }
}

/// 章节 ID，零填充保证字典序等于阅读顺序
pub fn chapter_id(number: usize) -> String {
    format!("ch-{:04}", number)
}

/// 片段 ID，零填充保证字典序等于阅读顺序
pub fn segment_id(chapter_number: usize, seq: usize) -> String {
    format!("{:04}-{:06}", chapter_number, seq)
}

/// 时间戳粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampGranularity {
    Word,
    Sentence,
}

/// 单个时间戳（秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampItem {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// 片段内的词/句级时间轴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    pub granularity: TimestampGranularity,
    pub items: Vec<TimestampItem>,
}

impl Timestamps {
    pub fn words(items: Vec<TimestampItem>) -> Self {
        Self {
            granularity: TimestampGranularity::Word,
            items,
        }
    }

    /// 最后一项的结束时间，即片段时长
    pub fn duration(&self) -> f64 {
        self.items.last().map(|item| item.end).unwrap_or(0.0)
    }
}

/// 片段在原文中的位置及相邻片段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    pub chapter_id: String,
    pub paragraph_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_segment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_segment_id: Option<String>,
}

/// 处理审计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    #[serde(default)]
    pub segmenter_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// 片段 - 归属单一角色的一段文本，最终携带合成音频
///
/// 不变量:
/// - voice_id 为空 当且仅当 片段尚未合成
/// - 合成器只修改一次（voice_id + timestamps + audio_path + processing）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub book_id: String,
    pub chapter_id: String,
    pub text: String,
    #[serde(default)]
    pub language: String,
    /// 角色标识
    pub person: String,
    #[serde(default)]
    pub voice_description: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
    /// 合成后音频所在的存储 key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub processing: ProcessingInfo,
}

impl Segment {
    pub fn is_synthesized(&self) -> bool {
        !self.voice_id.is_empty()
    }

    /// 时长（秒），无时间戳时为 0
    pub fn duration(&self) -> f64 {
        self.timestamps
            .as_ref()
            .map(Timestamps::duration)
            .unwrap_or(0.0)
    }

    /// 写入合成结果
    pub fn apply_synthesis(
        &mut self,
        voice_id: impl Into<String>,
        timestamps: Option<Timestamps>,
        audio_path: impl Into<String>,
        provider: impl Into<String>,
    ) {
        self.voice_id = voice_id.into();
        self.timestamps = timestamps;
        self.audio_path = Some(audio_path.into());
        self.processing.tts_provider = Some(provider.into());
        self.processing.generated_at = Some(Utc::now());
    }
}
