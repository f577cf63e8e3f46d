//! Book Context - 处理进度读模型（派生，不存储）

use serde::Serialize;

use super::{Book, BookStatus, Segment};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStatus {
    pub book_id: String,
    pub status: BookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_chapters: usize,
    pub total_segments: usize,
    pub synthesized_segments: usize,
    /// 0.0 ~ 1.0
    pub progress: f64,
}

impl ProcessingStatus {
    pub fn from_book(book: &Book, segments: &[Segment]) -> Self {
        let synthesized_segments = segments.iter().filter(|s| s.is_synthesized()).count();
        let total_segments = segments.len().max(book.total_segments);
        let progress = if total_segments == 0 {
            0.0
        } else {
            synthesized_segments as f64 / total_segments as f64
        };

        Self {
            book_id: book.id.clone(),
            status: book.status,
            error: book.error.clone(),
            total_chapters: book.total_chapters,
            total_segments,
            synthesized_segments,
            progress,
        }
    }
}
