//! Persistence Layer
//!
//! - storage_repo: 基于 StoragePort 的 Book 仓储
//! - sled: 嵌入式对象存储

pub mod sled;
mod storage_repo;

pub use storage_repo::StorageBookRepository;
