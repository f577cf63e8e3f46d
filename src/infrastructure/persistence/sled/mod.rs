//! Sled 嵌入式对象存储

mod object_storage;

pub use object_storage::{SledObjectStorage, SledStorageConfig};
