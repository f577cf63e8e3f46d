//! Book HTTP Handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::{
    ApplicationError, AssignVoices, CreateBook, GetBook, GetProcessingStatus, GetSegmentAudio,
    GetVoiceMap, ListBooks, ListChapters, ListSegments, PackageBook, ParseBook, SegmentBook,
    StreamSegments, SynthesizeBook, encode_ndjson, PACKAGE_CONTENT_TYPE,
};
use crate::domain::book::{Book, BookStatus, Chapter, ProcessingStatus, Segment, VoiceMap};
use crate::infrastructure::http::dto::{
    ApiResponse, SegmentRequest, SegmentResponse, StreamParams, SynthesizeAccepted,
    SynthesizeRequest, UploadResponse, VoiceMapRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_FORMAT: &str = "txt";

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// 上传
// ============================================================================

/// 上传文档（解析在后台进行，状态变化通过 /ws/events 通知）
///
/// multipart 字段：`file`（必填）、`title`、`author`、`language`、`format`
pub async fn upload_book(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut title: Option<String> = None;
    let mut author = String::new();
    let mut language: Option<String> = None;
    let mut format: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut document: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                document = Some(bytes.to_vec());
            }
            "title" | "author" | "language" | "format" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read {}: {}", field_name, e))
                })?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match field_name.as_str() {
                    "title" => title = Some(value),
                    "author" => author = value,
                    "language" => language = Some(value),
                    _ => format = Some(value.to_ascii_lowercase()),
                }
            }
            _ => {}
        }
    }

    let document = document.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if document.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    let stem_and_ext = filename.as_deref().map(split_file_name);
    let format = format
        .or_else(|| stem_and_ext.as_ref().and_then(|(_, ext)| ext.clone()))
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    if state.parsers.get(&format).is_err() {
        return Err(ApiError::BadRequest(format!(
            "Unsupported format: {} (supported: {})",
            format,
            state.parsers.formats().join(", ")
        )));
    }
    let title = title
        .or_else(|| stem_and_ext.map(|(stem, _)| stem))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    // Step 1: 创建 uploaded 状态的记录，立即返回 ID
    let book = state
        .create_book_handler
        .handle(CreateBook {
            title,
            author,
            language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            orig_format: format,
        })
        .await?;

    let response = UploadResponse {
        id: book.id.clone(),
        title: book.title.clone(),
        orig_format: book.orig_format.clone(),
        status: book.status,
    };

    // Step 2: 后台解析，失败时 Book 进入 error 并发布事件
    let state_clone = state.clone();
    let book_id = book.id;
    tokio::spawn(async move {
        let command = ParseBook {
            book_id: book_id.clone(),
            document,
        };
        match state_clone.parse_book_handler.handle(command).await {
            Ok(result) => {
                tracing::info!(
                    book_id = %result.book_id,
                    chapters = result.total_chapters,
                    "Background parse finished"
                );
            }
            Err(e) => {
                tracing::warn!(book_id = %book_id, error = %e, "Background parse failed");
            }
        }
    });

    Ok(Json(ApiResponse::success(response)))
}

/// `moby-dick.TXT` → ("moby-dick", Some("txt"))
fn split_file_name(name: &str) -> (String, Option<String>) {
    let path = std::path::Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    (stem, ext)
}

// ============================================================================
// 读取
// ============================================================================

pub async fn list_books(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Book>> {
    let books = state.list_books_handler.handle(ListBooks).await?;
    Ok(Json(ApiResponse::success(books)))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> ApiResult<Book> {
    let book = state.get_book_handler.handle(GetBook { book_id }).await?;
    Ok(Json(ApiResponse::success(book)))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> ApiResult<ProcessingStatus> {
    let status = state
        .get_status_handler
        .handle(GetProcessingStatus { book_id })
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn list_chapters(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> ApiResult<Vec<Chapter>> {
    let chapters = state
        .list_chapters_handler
        .handle(ListChapters { book_id })
        .await?;
    Ok(Json(ApiResponse::success(chapters)))
}

pub async fn list_segments(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> ApiResult<Vec<Segment>> {
    let segments = state
        .list_segments_handler
        .handle(ListSegments { book_id })
        .await?;
    Ok(Json(ApiResponse::success(segments)))
}

// ============================================================================
// 分段 / 音色
// ============================================================================

pub async fn segment_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    body: Option<Json<SegmentRequest>>,
) -> ApiResult<SegmentResponse> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let provider = req
        .provider
        .unwrap_or_else(|| state.options.default_segmentation_provider.clone());

    let result = state
        .segment_book_handler
        .handle(SegmentBook { book_id, provider })
        .await?;
    Ok(Json(ApiResponse::success(result.into())))
}

pub async fn get_voice_map(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> ApiResult<VoiceMap> {
    let voice_map = state
        .get_voice_map_handler
        .handle(GetVoiceMap { book_id })
        .await?;
    Ok(Json(ApiResponse::success(voice_map)))
}

pub async fn put_voice_map(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<VoiceMapRequest>,
) -> ApiResult<VoiceMap> {
    let voice_map = state
        .assign_voices_handler
        .handle(AssignVoices {
            book_id,
            voices: req.voices,
        })
        .await?;
    Ok(Json(ApiResponse::success(voice_map)))
}

// ============================================================================
// 合成
// ============================================================================

/// 启动后台合成；同一本书同时只允许一个任务
pub async fn synthesize_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    body: Option<Json<SynthesizeRequest>>,
) -> ApiResult<SynthesizeAccepted> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let provider = req
        .provider
        .unwrap_or_else(|| state.options.default_synthesis_provider.clone());

    // 同步做廉价检查，让调用方立即拿到错误
    state
        .registry
        .synthesis(&provider)
        .map_err(ApplicationError::from)?;
    let book = state
        .get_book_handler
        .handle(GetBook {
            book_id: book_id.clone(),
        })
        .await?;
    let resumable = matches!(
        book.status,
        BookStatus::Synthesizing | BookStatus::SynthesisError
    );
    if !(book.is_ready_for_synthesis() || (req.resume && resumable)) {
        return Err(ApiError::Conflict(format!(
            "book {} is not ready for synthesis (status: {})",
            book.id, book.status
        )));
    }

    let token = CancellationToken::new();
    match state.synthesis_jobs.entry(book_id.clone()) {
        Entry::Occupied(_) => {
            return Err(ApiError::Conflict(format!(
                "synthesis already running for book {}",
                book_id
            )));
        }
        Entry::Vacant(entry) => {
            entry.insert(token.clone());
        }
    }

    let mut command = SynthesizeBook::new(book_id.clone(), provider.clone()).with_cancel(token);
    if req.resume {
        command = command.resume();
    }

    let state_clone = state.clone();
    let job_book_id = book_id.clone();
    tokio::spawn(async move {
        match state_clone.synthesize_book_handler.handle(command).await {
            Ok(result) => {
                tracing::info!(
                    book_id = %result.book_id,
                    status = %result.status,
                    synthesized = result.synthesized,
                    skipped = result.skipped,
                    failed = result.failed.len(),
                    "Background synthesis finished"
                );
            }
            Err(e) => {
                tracing::warn!(book_id = %job_book_id, error = %e, "Background synthesis failed");
            }
        }
        state_clone.synthesis_jobs.remove(&job_book_id);
    });

    Ok(Json(ApiResponse::success(SynthesizeAccepted {
        book_id,
        provider,
        resume: req.resume,
    })))
}

// ============================================================================
// 播放 / 导出
// ============================================================================

/// 增量播放：NDJSON，每行一个 `{segment, audio_url}`
pub async fn stream_segments(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Result<Response, ApiError> {
    let items = state
        .stream_segments_handler
        .handle(StreamSegments {
            book_id,
            after: params.after,
        })
        .await?;
    let body = encode_ndjson(&items)?;

    Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response())
}

pub async fn get_segment_audio(
    State(state): State<Arc<AppState>>,
    Path((book_id, segment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let audio = state
        .get_segment_audio_handler
        .handle(GetSegmentAudio {
            book_id,
            segment_id,
        })
        .await?;

    Ok(([(header::CONTENT_TYPE, audio.content_type)], audio.audio_data).into_response())
}

pub async fn package_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Response, ApiError> {
    let archive = state
        .package_book_handler
        .handle(PackageBook { book_id })
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, PACKAGE_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    )
        .into_response())
}
