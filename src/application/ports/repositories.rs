//! Repository Ports - 出站端口
//!
//! Book / Chapter / Segment / VoiceMap 的持久化抽象
//!
//! 不提供乐观并发控制：同一实体的并发写入以最后一次为准

use async_trait::async_trait;
use thiserror::Error;

use super::StorageError;
use crate::domain::book::{Book, BookStatus, Chapter, DomainError, Segment, VoiceMap};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Book 可变字段更新（None 表示不修改）
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub status: Option<BookStatus>,
    pub total_chapters: Option<usize>,
    pub total_segments: Option<usize>,
    /// `Some(None)` 清空错误信息
    pub error: Option<Option<String>>,
}

impl BookUpdate {
    pub fn status(status: BookStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_total_chapters(mut self, total: usize) -> Self {
        self.total_chapters = Some(total);
        self
    }

    pub fn with_total_segments(mut self, total: usize) -> Self {
        self.total_segments = Some(total);
        self
    }

    /// 应用到 Book 上
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(language) = self.language {
            book.language = language;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
        if let Some(total) = self.total_chapters {
            book.total_chapters = total;
        }
        if let Some(total) = self.total_segments {
            book.total_segments = total;
        }
        if let Some(error) = self.error {
            book.error = error;
        }
    }
}

/// Book Repository Port
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    // ---------------------------------------------------------------- Book

    async fn save_book(&self, book: &Book) -> Result<(), RepositoryError>;

    /// 不存在时返回 [`RepositoryError::NotFound`]
    async fn get_book(&self, book_id: &str) -> Result<Book, RepositoryError>;

    /// 读取 → 应用更新 → 写回，返回更新后的 Book
    async fn update_book(&self, book_id: &str, update: BookUpdate)
        -> Result<Book, RepositoryError>;

    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError>;

    // ------------------------------------------------------------- Chapter

    async fn save_chapter(&self, chapter: &Chapter) -> Result<(), RepositoryError>;

    async fn get_chapter(&self, book_id: &str, chapter_id: &str)
        -> Result<Chapter, RepositoryError>;

    /// 按存储 key 字典序
    async fn list_chapters(&self, book_id: &str) -> Result<Vec<Chapter>, RepositoryError>;

    // ------------------------------------------------------------- Segment

    async fn save_segment(&self, segment: &Segment) -> Result<(), RepositoryError>;

    async fn get_segment(&self, book_id: &str, segment_id: &str)
        -> Result<Segment, RepositoryError>;

    /// 按存储 key 字典序（稳定）
    async fn list_segments(&self, book_id: &str) -> Result<Vec<Segment>, RepositoryError>;

    // ------------------------------------------------------------ VoiceMap

    async fn save_voice_map(&self, voice_map: &VoiceMap) -> Result<(), RepositoryError>;

    async fn get_voice_map(&self, book_id: &str) -> Result<VoiceMap, RepositoryError>;
}
