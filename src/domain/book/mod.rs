//! Book Context - 书籍限界上下文
//!
//! 职责:
//! - Book 聚合及其状态机
//! - 章节、片段实体
//! - 音色映射
//! - 处理进度读模型

mod aggregate;
mod entities;
mod errors;
mod progress;
mod value_objects;
mod voice_map;

pub use aggregate::Book;
pub use entities::{
    chapter_id, segment_id, Chapter, ProcessingInfo, Segment, SourceContext,
    TimestampGranularity, TimestampItem, Timestamps,
};
pub use errors::DomainError;
pub use progress::ProcessingStatus;
pub use value_objects::{validate_id, BookStatus};
pub use voice_map::{PersonVoice, VoiceMap};
