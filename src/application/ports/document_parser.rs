//! Document Parser Port - 文档解析抽象
//!
//! 格式相关的文本提取（txt / pdf / epub）由外部实现，
//! 核心只消费其产出的有序章节

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::book::Chapter;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// 文档解析器
pub trait DocumentParser: Send + Sync {
    /// 解析原始字节，返回按 number 递增的章节
    fn parse(&self, book_id: &str, document: &[u8]) -> Result<Vec<Chapter>, ParseError>;
}

/// 按原始格式选取解析器
#[derive(Default, Clone)]
pub struct ParserFactory {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
}

impl ParserFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册解析器，格式名不区分大小写
    pub fn register(mut self, format: &str, parser: Arc<dyn DocumentParser>) -> Self {
        self.parsers.insert(format.to_ascii_lowercase(), parser);
        self
    }

    pub fn get(&self, format: &str) -> Result<Arc<dyn DocumentParser>, ParseError> {
        self.parsers
            .get(&format.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ParseError::UnsupportedFormat(format.to_string()))
    }

    /// 已注册的格式（字典序）
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.parsers.keys().cloned().collect();
        formats.sort();
        formats
    }
}
