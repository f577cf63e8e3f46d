//! 应用层错误定义
//!
//! 统一的命令/查询错误类型：
//! - Validation / NotFound / InvalidState 不重试，直接返回调用方
//! - Provider / Storage 可能是瞬时故障，合成器内部按配置重试

use thiserror::Error;

use super::ports::{ParseError, ProviderError, RepositoryError, StorageError};
use super::registry::RegistryError;
use crate::domain::book::DomainError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 调用参数不合法
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 资源未找到（Book / Chapter / Segment / Provider）
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Book 状态不满足前置条件
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 外部供应商失败
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// 存储 I/O 失败
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 调用被取消
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 是否值得重试
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderError(_) | Self::StorageError(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { resource_type, id } => Self::NotFound { resource_type, id },
            RepositoryError::Validation(msg) => Self::ValidationError(msg),
            RepositoryError::Storage(e) => Self::StorageError(e.to_string()),
            RepositoryError::Serialization(msg) => Self::InternalError(msg),
        }
    }
}

impl From<StorageError> for ApplicationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Self::not_found("Object", key),
            StorageError::InvalidKey(key) => Self::ValidationError(format!("invalid key: {}", key)),
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApplicationError {
    fn from(err: ProviderError) -> Self {
        Self::ProviderError(err.to_string())
    }
}

impl From<RegistryError> for ApplicationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { kind, name } => Self::NotFound {
                resource_type: match kind {
                    super::registry::ProviderKind::Segmentation => "Segmentation provider",
                    super::registry::ProviderKind::Synthesis => "Synthesis provider",
                    super::registry::ProviderKind::Extraction => "Extraction provider",
                },
                id: name,
            },
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTransition { .. } => Self::InvalidState(err.to_string()),
            DomainError::Validation(msg) => Self::ValidationError(msg),
        }
    }
}

impl From<ParseError> for ApplicationError {
    fn from(err: ParseError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApplicationError::ProviderError("503".into()).is_transient());
        assert!(ApplicationError::StorageError("disk".into()).is_transient());
        assert!(!ApplicationError::invalid_state("not ready").is_transient());
        assert!(!ApplicationError::not_found("Book", "x").is_transient());
    }

    #[test]
    fn test_repository_not_found_is_preserved() {
        let err: ApplicationError = RepositoryError::not_found("Segment", "0001-000001").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Segment not found: 0001-000001");
    }

    #[test]
    fn test_storage_io_maps_to_storage_error() {
        let err: ApplicationError = StorageError::Io("broken pipe".into()).into();
        assert!(matches!(err, ApplicationError::StorageError(_)));
    }
}
