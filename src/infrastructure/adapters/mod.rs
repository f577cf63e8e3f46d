//! Adapters - 外部服务适配器

pub mod ocr;
pub mod parser;
pub mod segmenter;
pub mod storage;
pub mod tts;

pub use ocr::*;
pub use parser::*;
pub use segmenter::*;
pub use storage::*;
pub use tts::*;
