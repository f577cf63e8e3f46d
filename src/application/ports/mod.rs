//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod document_parser;
mod providers;
mod repositories;
mod storage;

pub use document_parser::{DocumentParser, ParseError, ParserFactory};
pub use providers::{
    ExtractionProvider, ExtractionRequest, ExtractionResult, ProviderError, SegmentDraft,
    SegmentationProvider, SegmentationRequest, SynthesisProvider, SynthesisRequest,
    SynthesisResponse,
};
pub use repositories::{BookRepositoryPort, BookUpdate, RepositoryError};
pub use storage::{ancestor_keys, keys, validate_key, validate_prefix, StorageError, StoragePort};
