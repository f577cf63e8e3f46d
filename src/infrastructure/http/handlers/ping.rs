//! Ping / Providers Handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, ProvidersResponse};
use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Ping endpoint - 健康检查
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 已注册的供应商与支持的文档格式
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ProvidersResponse>> {
    Json(ApiResponse::success(ProvidersResponse {
        providers: state.registry.all_names(),
        formats: state.parsers.formats(),
        default_synthesis: state.options.default_synthesis_provider.clone(),
        default_segmentation: state.options.default_segmentation_provider.clone(),
    }))
}
