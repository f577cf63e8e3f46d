//! Plain-text Parser
//!
//! 整个文档作为一章，每个非空行为一个段落。
//! 标题识别等启发式规则不在此处理。

use crate::application::ports::{DocumentParser, ParseError};
use crate::domain::book::Chapter;

pub struct PlainTextParser {
    chapter_title: String,
}

impl PlainTextParser {
    pub fn new(chapter_title: impl Into<String>) -> Self {
        Self {
            chapter_title: chapter_title.into(),
        }
    }
}

impl Default for PlainTextParser {
    fn default() -> Self {
        Self::new("Chapter 1")
    }
}

impl DocumentParser for PlainTextParser {
    fn parse(&self, book_id: &str, document: &[u8]) -> Result<Vec<Chapter>, ParseError> {
        let text = std::str::from_utf8(document)
            .map_err(|e| ParseError::InvalidDocument(format!("not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        let paragraphs: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if paragraphs.is_empty() {
            return Err(ParseError::InvalidDocument("document is empty".to_string()));
        }

        let chapter = Chapter::new(book_id, 1, self.chapter_title.clone())
            .with_toc_path(vec![self.chapter_title.clone()])
            .with_paragraphs(paragraphs);

        Ok(vec![chapter])
    }
}
