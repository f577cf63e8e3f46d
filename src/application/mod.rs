//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Storage、BookRepository、Providers、DocumentParser）
//! - registry: 按名称选取的供应商注册表
//! - commands: CQRS 命令及处理器（解析、分段、音色、合成）
//! - queries: CQRS 查询及处理器（读取、流式、打包）
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod registry;

// Re-exports
pub use commands::{
    handlers::{
        AssignVoicesHandler, CreateBookHandler, ParseBookHandler, ParseBookResponse,
        SegmentBookHandler, SegmentBookResponse, SynthesisConfig, SynthesizeBookHandler,
        SynthesizeBookResponse, DEFAULT_CONTEXT_PARAGRAPHS,
    },
    AssignVoices, CreateBook, ParseBook, SegmentBook, SynthesizeBook,
};

pub use error::ApplicationError;

pub use ports::{
    BookRepositoryPort, BookUpdate, DocumentParser, ExtractionProvider, ExtractionRequest,
    ExtractionResult, ParseError, ParserFactory, ProviderError, RepositoryError, SegmentDraft,
    SegmentationProvider, SegmentationRequest, StorageError, StoragePort, SynthesisProvider,
    SynthesisRequest, SynthesisResponse,
};

pub use queries::{
    handlers::{
        audio_content_type, encode_ndjson, GetBookHandler, GetProcessingStatusHandler,
        GetSegmentAudioHandler, GetVoiceMapHandler, ListBooksHandler, ListChaptersHandler,
        ListSegmentsHandler, Manifest, PackageArchive, PackageBookHandler, SegmentAudio,
        StreamItem, StreamSegmentsHandler, TocEntry, PACKAGE_CONTENT_TYPE,
    },
    GetBook, GetProcessingStatus, GetSegmentAudio, GetVoiceMap, ListBooks, ListChapters,
    ListSegments, PackageBook, StreamSegments,
};

pub use registry::{ProviderKind, ProviderNames, ProviderRegistry, RegistryError};
