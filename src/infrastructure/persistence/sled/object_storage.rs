//! Sled-based Object Storage Implementation
//!
//! 每个 bucket 对应一个 sled Tree，value 为 bincode 编码的对象信封
//! （数据 + 大小 + MD5 ETag + 修改时间）。sled 的 key 天然按字节序排列，
//! 与文件系统实现的 list 顺序一致。

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;

use crate::application::ports::{
    ancestor_keys, validate_key, validate_prefix, StorageError, StoragePort,
};

/// Sled 对象存储配置
#[derive(Debug, Clone)]
pub struct SledStorageConfig {
    /// 数据库路径
    pub db_path: String,
    /// bucket 名称
    pub bucket: String,
}

impl Default for SledStorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/objects.sled".to_string(),
            bucket: "bookvox".to_string(),
        }
    }
}

/// 对象信封
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectEnvelope {
    data: Vec<u8>,
    size_bytes: u64,
    etag: String,
    modified_at: i64,
}

impl ObjectEnvelope {
    fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            size_bytes: data.len() as u64,
            etag: format!("{:x}", md5::compute(data)),
            modified_at: Utc::now().timestamp(),
        }
    }

    fn verify(&self, key: &str) -> Result<(), StorageError> {
        let actual = format!("{:x}", md5::compute(&self.data));
        if actual != self.etag || self.data.len() as u64 != self.size_bytes {
            return Err(StorageError::Backend(format!(
                "checksum mismatch for {}: expected {}, got {}",
                key, self.etag, actual
            )));
        }
        Ok(())
    }
}

/// Sled 对象存储
pub struct SledObjectStorage {
    db: Db,
    bucket: Tree,
}

impl SledObjectStorage {
    pub fn new(config: &SledStorageConfig) -> Result<Self, StorageError> {
        let db = sled::open(&config.db_path).map_err(|e| StorageError::Backend(e.to_string()))?;
        let bucket = db
            .open_tree(&config.bucket)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::info!(
            db_path = %config.db_path,
            bucket = %config.bucket,
            objects = bucket.len(),
            "SledObjectStorage initialized"
        );

        Ok(Self { db, bucket })
    }

    /// key 的祖先已是对象，或 key 下已有子对象
    fn conflicts(&self, key: &str) -> Result<bool, StorageError> {
        for ancestor in ancestor_keys(key) {
            if self
                .bucket
                .contains_key(ancestor.as_bytes())
                .map_err(|e| StorageError::Io(e.to_string()))?
            {
                return Ok(true);
            }
        }

        let children = format!("{}/", key);
        match self.bucket.scan_prefix(children.as_bytes()).next() {
            Some(Err(e)) => Err(StorageError::Io(e.to_string())),
            Some(Ok(_)) => Ok(true),
            None => Ok(false),
        }
    }

    /// 打开现有存储（默认 bucket）
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let config = SledStorageConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// 刷盘
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StoragePort for SledObjectStorage {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;

        if self.conflicts(key)? {
            return Err(StorageError::Conflict(key.to_string()));
        }

        let envelope = ObjectEnvelope::new(data);
        let bytes =
            bincode::serialize(&envelope).map_err(|e| StorageError::Backend(e.to_string()))?;

        self.bucket
            .insert(key.as_bytes(), bytes)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        self.bucket
            .flush_async()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(key = %key, size = data.len(), etag = %envelope.etag, "Object written");

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;

        let bytes = self
            .bucket
            .get(key.as_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let envelope: ObjectEnvelope =
            bincode::deserialize(&bytes).map_err(|e| StorageError::Backend(e.to_string()))?;
        envelope.verify(key)?;

        Ok(envelope.data)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;

        if self
            .bucket
            .contains_key(key.as_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))?
        {
            Ok(true)
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        if self
            .bucket
            .remove(key.as_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))?
            .is_some()
        {
            self.bucket
                .flush_async()
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
            tracing::debug!(key = %key, "Object deleted");
        }

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        let mut keys = Vec::new();
        for item in self.bucket.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item.map_err(|e| StorageError::Io(e.to_string()))?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            keys.push(key);
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::storage::contract;
    use tempfile::tempdir;

    fn open_temp(dir: &tempfile::TempDir) -> SledObjectStorage {
        let config = SledStorageConfig {
            db_path: dir.path().join("objects.sled").to_string_lossy().to_string(),
            bucket: "test".to_string(),
        };
        SledObjectStorage::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_storage_contract() {
        let dir = tempdir().unwrap();
        let storage = open_temp(&dir);

        contract::check_storage_contract(&storage).await;
    }

    #[tokio::test]
    async fn test_objects_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = open_temp(&dir);
            storage.put("books/b1/book.json", b"persisted").await.unwrap();
            storage.flush().await.unwrap();
        }

        let storage = open_temp(&dir);
        assert_eq!(
            storage.get("books/b1/book.json").await.unwrap(),
            b"persisted".to_vec()
        );
    }

    #[test]
    fn test_envelope_detects_corruption() {
        let mut envelope = ObjectEnvelope::new(b"audio");
        assert!(envelope.verify("k").is_ok());

        envelope.data = b"AUDIO".to_vec();
        assert!(matches!(envelope.verify("k"), Err(StorageError::Backend(_))));
    }
}
