//! Storage Port - 出站端口
//!
//! 层级 key 的对象存储抽象。key 以 `/` 分隔，形成虚拟目录：
//!
//! ```text
//! books/{bookID}/book.json
//! books/{bookID}/chapters/{chapterID}.json
//! books/{bookID}/segments/{segmentID}.json
//! books/{bookID}/voice-map.json
//! books/{bookID}/audio/{segmentID}.{format}
//! ```
//!
//! 不提供多 key 事务；单个 key 的写入在返回后即持久化。
//! 本地文件系统实现与对象存储实现行为一致。

use async_trait::async_trait;
use thiserror::Error;

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// key 不存在（与 I/O 故障区分）
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// key 与已有对象的层级冲突（父路径本身是对象，或 key 下已有子对象）
    #[error("Key conflicts with existing object: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Storage Port
///
/// 不同 key 之间可安全并发访问
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// 写入（覆盖）；层级冲突时返回 [`StorageError::Conflict`]
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// 读取，不存在时返回 [`StorageError::NotFound`]
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// 存在时返回 `true`，不存在时返回 [`StorageError::NotFound`]
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// 删除，不存在时视为成功
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// 列出前缀下的所有 key（字典序）
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// 存储 key 布局（Packaging / Streaming 依赖此布局）
pub mod keys {
    pub const BOOKS_PREFIX: &str = "books/";

    pub fn book(book_id: &str) -> String {
        format!("books/{}/book.json", book_id)
    }

    pub fn chapters_prefix(book_id: &str) -> String {
        format!("books/{}/chapters/", book_id)
    }

    pub fn chapter(book_id: &str, chapter_id: &str) -> String {
        format!("books/{}/chapters/{}.json", book_id, chapter_id)
    }

    pub fn segments_prefix(book_id: &str) -> String {
        format!("books/{}/segments/", book_id)
    }

    pub fn segment(book_id: &str, segment_id: &str) -> String {
        format!("books/{}/segments/{}.json", book_id, segment_id)
    }

    pub fn voice_map(book_id: &str) -> String {
        format!("books/{}/voice-map.json", book_id)
    }

    pub fn audio(book_id: &str, segment_id: &str, format: &str) -> String {
        format!("books/{}/audio/{}.{}", book_id, segment_id, format)
    }
}

/// 校验 key
///
/// 非空、非绝对路径、不含空段 / `.` / `..` / 反斜杠
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if key
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// 校验 list 前缀，允许为空或以 `/` 结尾
pub fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate_key(prefix.trim_end_matches('/'))
}

/// key 的所有祖先 key，由近及远：`a/b/c` → `a/b`, `a`
pub fn ancestor_keys(key: &str) -> impl Iterator<Item = &str> {
    key.rmatch_indices('/').map(move |(pos, _)| &key[..pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("books/b1/book.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a/b/").is_err());
    }

    #[test]
    fn test_ancestor_keys() {
        let ancestors: Vec<&str> = ancestor_keys("books/b1/audio/x.wav").collect();
        assert_eq!(ancestors, vec!["books/b1/audio", "books/b1", "books"]);
        assert_eq!(ancestor_keys("book.json").count(), 0);
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("").is_ok());
        assert!(validate_prefix("books/").is_ok());
        assert!(validate_prefix("books/b1/seg").is_ok());
        assert!(validate_prefix("../").is_err());
    }
}
