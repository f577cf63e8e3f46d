//! Domain Layer - 领域层
//!
//! - Book Context: 书籍、章节、片段、音色映射及状态机
//! - 句子切分（规则分段供应商使用）

pub mod book;

mod text_segmenter;

pub use text_segmenter::{is_quoted, split_paragraph, SplitConfig};
