//! Book Context - Errors

use thiserror::Error;

use super::BookStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: BookStatus, to: BookStatus },

    #[error("validation failed: {0}")]
    Validation(String),
}
