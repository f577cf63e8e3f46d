//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                               GET   健康检查
//! - /api/providers                          GET   已注册供应商
//! - /api/books                              GET   列出书籍
//! - /api/books/upload                       POST  上传文档（后台解析）
//! - /api/books/:id                          GET   书籍详情
//! - /api/books/:id/status                   GET   处理进度
//! - /api/books/:id/chapters                 GET   章节
//! - /api/books/:id/segments                 GET   片段
//! - /api/books/:id/segment                  POST  分段
//! - /api/books/:id/voice-map                GET / PUT  音色映射
//! - /api/books/:id/synthesize               POST  启动合成（后台）
//! - /api/books/:id/package                  GET   下载 tar 归档
//! - /api/books/:id/stream?after=            GET   NDJSON 增量播放
//! - /api/books/:id/audio/:segment_id        GET   片段音频
//! - /ws/events?book_id=                     WS    进度事件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/providers", get(handlers::list_providers))
        .nest("/books", book_routes())
}

/// Book 路由
fn book_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list_books))
        .route("/upload", post(handlers::upload_book))
        .route("/:book_id", get(handlers::get_book))
        .route("/:book_id/status", get(handlers::get_status))
        .route("/:book_id/chapters", get(handlers::list_chapters))
        .route("/:book_id/segments", get(handlers::list_segments))
        .route("/:book_id/segment", post(handlers::segment_book))
        .route(
            "/:book_id/voice-map",
            get(handlers::get_voice_map).put(handlers::put_voice_map),
        )
        .route("/:book_id/synthesize", post(handlers::synthesize_book))
        .route("/:book_id/package", get(handlers::package_book))
        .route("/:book_id/stream", get(handlers::stream_segments))
        .route(
            "/:book_id/audio/:segment_id",
            get(handlers::get_segment_audio),
        )
}
