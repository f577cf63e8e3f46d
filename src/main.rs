//! Bookvox - 有声书生产流水线
//!
//! 启动顺序：配置 → 日志 → 存储 → 供应商 → HTTP 服务

use std::sync::Arc;

use bookvox::application::{
    ParserFactory, ProviderRegistry, StoragePort, SynthesisConfig,
};
use bookvox::config::{load_config, print_config, AppConfig, StorageBackend};
use bookvox::infrastructure::adapters::{
    FakeTtsClient, FileStorage, HttpOcrClient, HttpOcrClientConfig, HttpTtsClient,
    HttpTtsClientConfig, PlainTextParser, RuleBasedSegmenter,
};
use bookvox::infrastructure::events::EventPublisher;
use bookvox::infrastructure::http::{AppState, HttpServer, ServerConfig, StateOptions};
use bookvox::infrastructure::persistence::sled::{SledObjectStorage, SledStorageConfig};
use bookvox::infrastructure::persistence::StorageBookRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Bookvox - 有声书生产流水线");
    print_config(&config);

    // 存储
    let mut sled_storage: Option<Arc<SledObjectStorage>> = None;
    let storage: Arc<dyn StoragePort> = match config.storage.backend {
        StorageBackend::Local => Arc::new(FileStorage::new(&config.storage.root).await?),
        StorageBackend::Sled => {
            if let Some(parent) = std::path::Path::new(&config.storage.sled_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let sled = Arc::new(SledObjectStorage::new(&SledStorageConfig {
                db_path: config.storage.sled_path.clone(),
                bucket: config.storage.bucket.clone(),
            })?);
            sled_storage = Some(sled.clone());
            sled
        }
    };
    let repo = StorageBookRepository::new(storage.clone()).arc();

    // 供应商
    let registry = build_registry(&config)?;
    let names = registry.all_names();
    tracing::info!(
        segmentation = ?names.segmentation,
        synthesis = ?names.synthesis,
        extraction = ?names.extraction,
        "Providers registered"
    );
    if !names
        .synthesis
        .contains(&config.pipeline.default_synthesis_provider)
    {
        tracing::warn!(
            provider = %config.pipeline.default_synthesis_provider,
            "Default synthesis provider is not registered"
        );
    }

    // 文档解析器
    let parsers = ParserFactory::new().register("txt", Arc::new(PlainTextParser::default()));

    // 事件发布器
    let event_publisher = EventPublisher::new().arc();

    let options = StateOptions {
        public_base_url: config.server.public_base_url(),
        synthesis: SynthesisConfig {
            worker_pool_size: config.pipeline.worker_pool_size,
            max_retries: config.pipeline.max_retries,
            retry_backoff: config.pipeline.retry_backoff(),
        },
        context_paragraphs: config.pipeline.context_paragraphs,
        default_synthesis_provider: config.pipeline.default_synthesis_provider.clone(),
        default_segmentation_provider: config.pipeline.default_segmentation_provider.clone(),
    };
    let state = Arc::new(AppState::new(
        storage,
        repo,
        registry.clone(),
        parsers,
        event_publisher,
        options,
    ));

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_max_body_size(config.server.max_upload_size);
    let server = HttpServer::new(server_config, state.clone());

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    // 已提交的片段写入保留，下次可续跑
    state.cancel_synthesis_jobs();
    registry.close_all().await;
    if let Some(sled) = sled_storage {
        sled.flush().await?;
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// 初始化日志，`RUST_LOG` 优先于配置
fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},bookvox={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 按配置注册供应商
fn build_registry(config: &AppConfig) -> anyhow::Result<Arc<ProviderRegistry>> {
    let registry = ProviderRegistry::new().arc();

    registry.register_segmentation(Arc::new(RuleBasedSegmenter::with_defaults()));

    if config.tts.fake_enabled {
        registry.register_synthesis(Arc::new(FakeTtsClient::with_defaults()));
    }

    if let Some(url) = &config.tts.url {
        let tts_config = HttpTtsClientConfig::new(url.clone())
            .with_name(config.tts.name.clone())
            .with_timeout(config.tts.timeout_secs);
        registry.register_synthesis(Arc::new(HttpTtsClient::new(tts_config)?));
    }

    if let Some(url) = &config.ocr.url {
        let ocr_config = HttpOcrClientConfig::new(url.clone())
            .with_name(config.ocr.name.clone())
            .with_timeout(config.ocr.timeout_secs);
        registry.register_extraction(Arc::new(HttpOcrClient::new(ocr_config)?));
    }

    Ok(registry)
}
