//! File Storage - 本地文件系统存储实现
//!
//! key 直接映射为 `base_dir` 下的相对路径。写入先落到同目录的
//! `.partial` 临时文件再 rename，返回时对象已完整可见。
//!
//! 目录不是对象：路径落在目录上、或祖先路径是普通文件时，读取按
//! 不存在处理，写入按层级冲突拒绝，与 sled 实现的信号一致。

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{
    ancestor_keys, validate_key, validate_prefix, StorageError, StoragePort,
};

const PARTIAL_SUFFIX: &str = ".partial";

/// 文件系统存储
pub struct FileStorage {
    /// 存储根目录
    base_dir: PathBuf,
}

impl FileStorage {
    /// 创建新的文件存储
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::info!(base_dir = %base_dir.display(), "FileStorage initialized");

        Ok(Self { base_dir })
    }

    /// 获取存储根目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        let mut path = self.base_dir.clone();
        for part in key.split('/') {
            path.push(part);
        }
        Ok(path)
    }

    /// 祖先 key 中是否有已存在的对象
    async fn has_object_ancestor(&self, key: &str) -> bool {
        for ancestor in ancestor_keys(key) {
            let Ok(path) = self.path_for(ancestor) else {
                continue;
            };
            if let Ok(metadata) = fs::metadata(&path).await {
                if metadata.is_file() {
                    return true;
                }
            }
        }
        false
    }

    /// 文件路径 → key，非 UTF-8 文件名返回 None
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        parts.map(|p| p.join("/"))
    }
}

#[async_trait]
impl StoragePort for FileStorage {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        let is_dir = fs::metadata(&path).await.map_or(false, |m| m.is_dir());
        if is_dir || self.has_object_ancestor(key).await {
            return Err(StorageError::Conflict(key.to_string()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let partial = path.with_file_name(format!(
            ".{}.{}{}",
            file_name,
            Uuid::new_v4().simple(),
            PARTIAL_SUFFIX
        ));

        fs::write(&partial, data)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::Io(e.to_string()));
        }

        tracing::debug!(key = %key, size = data.len(), "Object written");

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(_) if path.is_dir() || self.has_object_ancestor(key).await => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(true),
            Ok(_) => Err(StorageError::NotFound(key.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(_) if self.has_object_ancestor(key).await => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Object deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) if path.is_dir() || self.has_object_ancestor(key).await => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        // 从前缀中最后一个 `/` 之前的目录开始遍历
        let start_dir = match prefix.rfind('/') {
            Some(pos) => {
                let mut dir = self.base_dir.clone();
                for part in prefix[..pos].split('/') {
                    dir.push(part);
                }
                dir
            }
            None => self.base_dir.clone(),
        };

        let mut keys = Vec::new();
        let mut pending = vec![start_dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // 前缀目录不存在或是普通文件：其下没有对象
                Err(e) if e.kind() == ErrorKind::NotFound || !dir.is_dir() => continue,
                Err(e) => return Err(StorageError::Io(e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::Io(e.to_string()))?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }

                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.ends_with(PARTIAL_SUFFIX))
                {
                    continue;
                }

                if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::storage::contract;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_storage_contract() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).await.unwrap();

        contract::check_storage_contract(&storage).await;
    }

    #[tokio::test]
    async fn test_keys_map_to_nested_files() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).await.unwrap();

        storage
            .put("books/b1/audio/0001-000000.wav", b"RIFF")
            .await
            .unwrap();

        let on_disk = temp_dir
            .path()
            .join("books")
            .join("b1")
            .join("audio")
            .join("0001-000000.wav");
        assert!(on_disk.exists());
    }

    #[tokio::test]
    async fn test_object_under_file_path_is_absent() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).await.unwrap();

        storage.put("books/b1/book.json", b"{}").await.unwrap();

        let child = "books/b1/book.json/child";
        assert!(storage.get(child).await.unwrap_err().is_not_found());
        assert!(storage.exists(child).await.unwrap_err().is_not_found());
        storage.delete(child).await.unwrap();
        assert!(storage.list("books/b1/book.json/").await.unwrap().is_empty());
        assert!(matches!(
            storage.put(child, b"x").await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(storage.get("books/b1/book.json").await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_partial_files_are_not_listed() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).await.unwrap();

        storage.put("books/b1/book.json", b"{}").await.unwrap();
        std::fs::write(
            temp_dir.path().join("books/b1/.book.json.abc.partial"),
            b"half",
        )
        .unwrap();

        let keys = storage.list("books/b1/").await.unwrap();
        assert_eq!(keys, vec!["books/b1/book.json"]);
    }
}
