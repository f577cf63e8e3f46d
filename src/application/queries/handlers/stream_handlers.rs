//! Stream Query Handler - 增量播放用的有序片段视图

use serde::Serialize;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::BookRepositoryPort;
use crate::application::queries::StreamSegments;
use crate::domain::book::Segment;

/// 流中的一项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamItem {
    pub segment: Segment,
    pub audio_url: String,
}

/// StreamSegments Handler
///
/// - `after` 为空：返回全部片段
/// - `after` 命中：返回其后的片段（不含自身）
/// - `after` 未命中：返回空
pub struct StreamSegmentsHandler {
    repo: Arc<dyn BookRepositoryPort>,
    /// 播放 URL 前缀，如 `http://host:5060`，为空时生成相对路径
    base_url: String,
}

impl StreamSegmentsHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>, base_url: impl Into<String>) -> Self {
        Self {
            repo,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn handle(&self, query: StreamSegments) -> Result<Vec<StreamItem>, ApplicationError> {
        let book = self.repo.get_book(&query.book_id).await?;
        let segments = self.repo.list_segments(&book.id).await?;

        let remaining: Vec<Segment> = match query.after.as_deref().filter(|a| !a.is_empty()) {
            None => segments,
            Some(after) => match segments.iter().position(|s| s.id == after) {
                Some(index) => segments.into_iter().skip(index + 1).collect(),
                None => {
                    tracing::debug!(
                        book_id = %book.id,
                        after = %after,
                        "Stream cursor not found, returning empty"
                    );
                    Vec::new()
                }
            },
        };

        Ok(remaining
            .into_iter()
            .map(|segment| StreamItem {
                audio_url: self.audio_url(&segment.book_id, &segment.id),
                segment,
            })
            .collect())
    }

    /// 稳定、可预测的播放地址
    pub fn audio_url(&self, book_id: &str, segment_id: &str) -> String {
        format!(
            "{}/api/books/{}/audio/{}",
            self.base_url, book_id, segment_id
        )
    }
}

/// NDJSON 编码：每个片段一行
pub fn encode_ndjson(items: &[StreamItem]) -> Result<Vec<u8>, ApplicationError> {
    let mut out = Vec::new();
    for item in items {
        serde_json::to_writer(&mut out, item)
            .map_err(|e| ApplicationError::internal(format!("encode stream item: {}", e)))?;
        out.push(b'\n');
    }
    Ok(out)
}
