//! Application State
//!
//! 持有端口、供应商注册表以及所有 Command/Query Handlers

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::{
    // Command handlers
    AssignVoicesHandler, CreateBookHandler, ParseBookHandler, SegmentBookHandler,
    SynthesisConfig, SynthesizeBookHandler,
    // Query handlers
    GetBookHandler, GetProcessingStatusHandler, GetSegmentAudioHandler, GetVoiceMapHandler,
    ListBooksHandler, ListChaptersHandler, ListSegmentsHandler, PackageBookHandler,
    StreamSegmentsHandler,
    // Ports
    BookRepositoryPort, ParserFactory, ProviderRegistry, StoragePort,
    DEFAULT_CONTEXT_PARAGRAPHS,
};
use crate::infrastructure::events::EventPublisher;

/// HTTP 层可调参数
#[derive(Debug, Clone)]
pub struct StateOptions {
    /// 生成音频 URL 的前缀
    pub public_base_url: String,
    pub synthesis: SynthesisConfig,
    pub context_paragraphs: usize,
    pub default_synthesis_provider: String,
    pub default_segmentation_provider: String,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            public_base_url: String::new(),
            synthesis: SynthesisConfig::default(),
            context_paragraphs: DEFAULT_CONTEXT_PARAGRAPHS,
            default_synthesis_provider: "fake".to_string(),
            default_segmentation_provider: "rule-based".to_string(),
        }
    }
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub storage: Arc<dyn StoragePort>,
    pub repo: Arc<dyn BookRepositoryPort>,
    pub registry: Arc<ProviderRegistry>,
    pub parsers: ParserFactory,
    pub event_publisher: Arc<EventPublisher>,
    pub options: StateOptions,

    /// 正在合成的书 → 取消令牌
    pub synthesis_jobs: DashMap<String, CancellationToken>,

    // ========== Command Handlers ==========
    pub create_book_handler: CreateBookHandler,
    pub parse_book_handler: ParseBookHandler,
    pub segment_book_handler: SegmentBookHandler,
    pub assign_voices_handler: AssignVoicesHandler,
    pub synthesize_book_handler: SynthesizeBookHandler,

    // ========== Query Handlers ==========
    pub get_book_handler: GetBookHandler,
    pub list_books_handler: ListBooksHandler,
    pub list_chapters_handler: ListChaptersHandler,
    pub list_segments_handler: ListSegmentsHandler,
    pub get_voice_map_handler: GetVoiceMapHandler,
    pub get_status_handler: GetProcessingStatusHandler,
    pub get_segment_audio_handler: GetSegmentAudioHandler,
    pub stream_segments_handler: StreamSegmentsHandler,
    pub package_book_handler: PackageBookHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        storage: Arc<dyn StoragePort>,
        repo: Arc<dyn BookRepositoryPort>,
        registry: Arc<ProviderRegistry>,
        parsers: ParserFactory,
        event_publisher: Arc<EventPublisher>,
        options: StateOptions,
    ) -> Self {
        Self {
            // Command handlers
            create_book_handler: CreateBookHandler::new(repo.clone(), event_publisher.clone()),
            parse_book_handler: ParseBookHandler::new(
                repo.clone(),
                parsers.clone(),
                event_publisher.clone(),
            ),
            segment_book_handler: SegmentBookHandler::new(
                repo.clone(),
                registry.clone(),
                event_publisher.clone(),
                options.context_paragraphs,
            ),
            assign_voices_handler: AssignVoicesHandler::new(
                repo.clone(),
                event_publisher.clone(),
            ),
            synthesize_book_handler: SynthesizeBookHandler::new(
                repo.clone(),
                storage.clone(),
                registry.clone(),
                event_publisher.clone(),
                options.synthesis.clone(),
            ),

            // Query handlers
            get_book_handler: GetBookHandler::new(repo.clone()),
            list_books_handler: ListBooksHandler::new(repo.clone()),
            list_chapters_handler: ListChaptersHandler::new(repo.clone()),
            list_segments_handler: ListSegmentsHandler::new(repo.clone()),
            get_voice_map_handler: GetVoiceMapHandler::new(repo.clone()),
            get_status_handler: GetProcessingStatusHandler::new(repo.clone()),
            get_segment_audio_handler: GetSegmentAudioHandler::new(repo.clone(), storage.clone()),
            stream_segments_handler: StreamSegmentsHandler::new(
                repo.clone(),
                options.public_base_url.clone(),
            ),
            package_book_handler: PackageBookHandler::new(repo.clone(), storage.clone()),

            // Ports
            storage,
            repo,
            registry,
            parsers,
            event_publisher,
            options,
            synthesis_jobs: DashMap::new(),
        }
    }

    /// 取消所有进行中的合成（关闭时调用）
    pub fn cancel_synthesis_jobs(&self) {
        for job in self.synthesis_jobs.iter() {
            tracing::info!(book_id = %job.key(), "Cancelling synthesis job");
            job.value().cancel();
        }
    }
}
