//! Book Commands - 流水线各阶段的写操作

use tokio_util::sync::CancellationToken;

use crate::domain::book::PersonVoice;

/// 创建书籍记录（status = uploaded）
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub language: String,
    /// 原始格式（txt / pdf / epub ...），用于选择解析器
    pub orig_format: String,
}

/// 解析文档：uploaded → parsing → segmenting
#[derive(Debug, Clone)]
pub struct ParseBook {
    pub book_id: String,
    pub document: Vec<u8>,
}

/// 分段：segmenting → voice_mapping
#[derive(Debug, Clone)]
pub struct SegmentBook {
    pub book_id: String,
    /// 分段供应商名称
    pub provider: String,
}

/// 分配音色：voice_mapping → ready
#[derive(Debug, Clone)]
pub struct AssignVoices {
    pub book_id: String,
    pub voices: Vec<PersonVoice>,
}

/// 合成：ready → synthesizing → {synthesized | synthesis_error}
#[derive(Debug, Clone)]
pub struct SynthesizeBook {
    pub book_id: String,
    /// 合成供应商名称
    pub provider: String,
    /// 续跑：允许从 synthesizing / synthesis_error 进入，跳过已完成片段
    pub resume: bool,
    pub cancel: Option<CancellationToken>,
}

impl SynthesizeBook {
    pub fn new(book_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            provider: provider.into(),
            resume: false,
            cancel: None,
        }
    }

    pub fn resume(mut self) -> Self {
        self.resume = true;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
