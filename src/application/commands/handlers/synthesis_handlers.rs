//! Synthesis Command Handler - 并发合成编排
//!
//! 流程:
//! 1. 校验状态（`ready`，续跑时允许 `synthesizing` / `synthesis_error`）与供应商
//! 2. 读取全部片段与音色映射
//! 3. Book → `synthesizing`
//! 4. 片段分发给受 semaphore 限制的 worker；瞬时错误按配置退避重试
//! 5. 所有 worker 结束后汇总：全部成功 → `synthesized`，否则 → `synthesis_error`
//!
//! 已写入的音频与片段不回滚。取消时 Book 保持 `synthesizing`，可用 resume 继续。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use super::lifecycle;
use crate::application::commands::SynthesizeBook;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    keys, BookRepositoryPort, StoragePort, SynthesisProvider, SynthesisRequest,
};
use crate::application::registry::ProviderRegistry;
use crate::domain::book::{validate_id, Book, BookStatus, Segment, Timestamps, VoiceMap};
use crate::infrastructure::events::EventPublisher;

/// 汇总错误信息中最多列出的片段数
const MAX_LISTED_FAILURES: usize = 10;

/// 合成配置
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// 并发 worker 数
    pub worker_pool_size: usize,
    /// 单个片段的最大重试次数（不含首次）
    pub max_retries: u32,
    /// 首次重试前的等待，之后每次翻倍
    pub retry_backoff: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 3,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// 合成结果
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeBookResponse {
    pub book_id: String,
    pub status: BookStatus,
    pub total_segments: usize,
    /// 本次合成成功的片段数
    pub synthesized: usize,
    /// 续跑时跳过的片段数
    pub skipped: usize,
    /// 失败片段 ID（字典序）
    pub failed: Vec<String>,
}

/// 单个片段的处理结果
#[derive(Debug)]
struct SegmentOutcome {
    segment_id: String,
    result: Result<f64, String>,
}

/// SynthesizeBook Handler
pub struct SynthesizeBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
    storage: Arc<dyn StoragePort>,
    registry: Arc<ProviderRegistry>,
    events: Arc<EventPublisher>,
    config: SynthesisConfig,
}

impl SynthesizeBookHandler {
    pub fn new(
        repo: Arc<dyn BookRepositoryPort>,
        storage: Arc<dyn StoragePort>,
        registry: Arc<ProviderRegistry>,
        events: Arc<EventPublisher>,
        config: SynthesisConfig,
    ) -> Self {
        Self {
            repo,
            storage,
            registry,
            events,
            config,
        }
    }

    pub async fn handle(
        &self,
        command: SynthesizeBook,
    ) -> Result<SynthesizeBookResponse, ApplicationError> {
        validate_id("book", &command.book_id)?;
        let mut book = self.repo.get_book(&command.book_id).await?;
        check_entry_state(&book, command.resume)?;
        let provider = self.registry.synthesis(&command.provider)?;

        let segments = self.repo.list_segments(&book.id).await?;
        let voice_map = self.repo.get_voice_map(&book.id).await?;
        let total_segments = segments.len();

        let (pending, skipped) = if command.resume {
            self.partition_done(segments).await?
        } else {
            (segments, 0)
        };

        lifecycle::advance(
            self.repo.as_ref(),
            &self.events,
            &mut book,
            BookStatus::Synthesizing,
        )
        .await?;

        tracing::info!(
            book_id = %book.id,
            provider = %provider.name(),
            pending = pending.len(),
            skipped = skipped,
            workers = self.config.worker_pool_size,
            "Synthesis started"
        );

        let cancel = command.cancel.unwrap_or_default();
        let pending_ids: Vec<String> = pending.iter().map(|s| s.id.clone()).collect();
        let outcomes = self
            .dispatch(&book.id, pending, voice_map, provider, &cancel)
            .await?;

        let failed = collect_failures(&pending_ids, &outcomes);
        let synthesized = pending_ids.len() - failed.len();

        if failed.is_empty() {
            lifecycle::advance(
                self.repo.as_ref(),
                &self.events,
                &mut book,
                BookStatus::Synthesized,
            )
            .await?;
        } else {
            let message = failure_message(&failed, total_segments);
            book.fail_synthesis(message)?;
            self.repo.save_book(&book).await?;
            self.events
                .publish_status_changed(&book.id, book.status, book.error.as_deref());
        }

        tracing::info!(
            book_id = %book.id,
            status = %book.status,
            synthesized = synthesized,
            skipped = skipped,
            failed = failed.len(),
            "Synthesis finished"
        );

        Ok(SynthesizeBookResponse {
            book_id: book.id,
            status: book.status,
            total_segments,
            synthesized,
            skipped,
            failed,
        })
    }

    /// 续跑：已有 voice_id 且音频存在的片段视为完成
    async fn partition_done(
        &self,
        segments: Vec<Segment>,
    ) -> Result<(Vec<Segment>, usize), ApplicationError> {
        let mut pending = Vec::with_capacity(segments.len());
        let mut skipped = 0;
        for segment in segments {
            let done = match (&segment.audio_path, segment.is_synthesized()) {
                (Some(path), true) => match self.storage.exists(path).await {
                    Ok(found) => found,
                    Err(e) if e.is_not_found() => false,
                    Err(e) => return Err(e.into()),
                },
                _ => false,
            };
            if done {
                skipped += 1;
            } else {
                pending.push(segment);
            }
        }
        Ok((pending, skipped))
    }

    /// 分发并等待所有 worker 完成
    async fn dispatch(
        &self,
        book_id: &str,
        segments: Vec<Segment>,
        voice_map: VoiceMap,
        provider: Arc<dyn SynthesisProvider>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SegmentOutcome>, ApplicationError> {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let (tx, mut rx) = mpsc::channel(segments.len().max(1));
        let worker = Arc::new(SegmentWorker {
            book_id: book_id.to_string(),
            repo: self.repo.clone(),
            storage: self.storage.clone(),
            provider,
            voice_map,
            events: self.events.clone(),
            max_retries: self.config.max_retries,
            retry_backoff: self.config.retry_backoff,
        });

        let total = segments.len();
        for segment in segments {
            let semaphore = semaphore.clone();
            let worker = worker.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    outcome = worker.run(segment) => {
                        let _ = tx.send(outcome).await;
                    }
                }
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        book_id = %book_id,
                        completed = outcomes.len(),
                        total = total,
                        "Synthesis cancelled"
                    );
                    return Err(ApplicationError::Cancelled(format!(
                        "synthesis of book {} cancelled after {} of {} segments",
                        book_id,
                        outcomes.len(),
                        total
                    )));
                }
                received = rx.recv() => match received {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                },
            }
        }

        Ok(outcomes)
    }
}

fn check_entry_state(book: &Book, resume: bool) -> Result<(), ApplicationError> {
    let allowed = match book.status {
        BookStatus::Ready => true,
        BookStatus::Synthesizing | BookStatus::SynthesisError => resume,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(ApplicationError::invalid_state(format!(
            "book {} is not ready for synthesis (status: {})",
            book.id, book.status
        )))
    }
}

/// 失败片段：结果为错误的，加上没有回报结果的（worker 异常退出）
fn collect_failures(pending_ids: &[String], outcomes: &[SegmentOutcome]) -> Vec<String> {
    let succeeded: HashSet<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_ok())
        .map(|o| o.segment_id.as_str())
        .collect();

    let mut failed: Vec<String> = pending_ids
        .iter()
        .filter(|id| !succeeded.contains(id.as_str()))
        .cloned()
        .collect();
    failed.sort();
    failed
}

fn failure_message(failed: &[String], total: usize) -> String {
    let listed = failed
        .iter()
        .take(MAX_LISTED_FAILURES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let more = failed.len().saturating_sub(MAX_LISTED_FAILURES);
    if more > 0 {
        format!(
            "{} of {} segments failed: {} (+{} more)",
            failed.len(),
            total,
            listed,
            more
        )
    } else {
        format!("{} of {} segments failed: {}", failed.len(), total, listed)
    }
}

/// 单片段合成 worker（各片段共享）
struct SegmentWorker {
    book_id: String,
    repo: Arc<dyn BookRepositoryPort>,
    storage: Arc<dyn StoragePort>,
    provider: Arc<dyn SynthesisProvider>,
    voice_map: VoiceMap,
    events: Arc<EventPublisher>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl SegmentWorker {
    async fn run(&self, mut segment: Segment) -> SegmentOutcome {
        let segment_id = segment.id.clone();

        let result = match self.voice_map.resolve(&segment.person).map(str::to_string) {
            Some(voice_id) => self.run_with_retry(&mut segment, &voice_id).await,
            // 映射缺失不会因重试而改变
            None => Err(format!("no voice assigned for persona '{}'", segment.person)),
        };

        match &result {
            Ok(duration) => {
                self.events
                    .publish_segment_synthesized(&self.book_id, &segment_id, *duration);
            }
            Err(error) => {
                tracing::warn!(
                    book_id = %self.book_id,
                    segment_id = %segment_id,
                    error = %error,
                    "Segment synthesis failed"
                );
                self.events
                    .publish_segment_failed(&self.book_id, &segment_id, error);
            }
        }

        SegmentOutcome { segment_id, result }
    }

    async fn run_with_retry(&self, segment: &mut Segment, voice_id: &str) -> Result<f64, String> {
        let mut attempt: u32 = 0;
        loop {
            match self.synthesize_once(segment, voice_id).await {
                Ok(duration) => return Ok(duration),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(
                        segment_id = %segment.id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying segment synthesis"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
    }

    /// provider 调用 → 写音频 → 更新片段
    async fn synthesize_once(
        &self,
        segment: &mut Segment,
        voice_id: &str,
    ) -> Result<f64, ApplicationError> {
        let voice_description = Some(segment.voice_description.clone()).filter(|d| !d.is_empty());
        let response = self
            .provider
            .synthesize(SynthesisRequest {
                text: segment.text.clone(),
                voice_id: voice_id.to_string(),
                language: segment.language.clone(),
                voice_description,
            })
            .await?;

        if response.format.is_empty() || !response.format.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ApplicationError::ProviderError(format!(
                "invalid audio format tag '{}'",
                response.format
            )));
        }

        let audio_key = keys::audio(&self.book_id, &segment.id, &response.format);
        self.storage.put(&audio_key, &response.audio).await?;

        segment.apply_synthesis(
            voice_id,
            response.word_timestamps.map(Timestamps::words),
            audio_key,
            self.provider.name(),
        );
        self.repo.save_segment(segment).await?;

        Ok(segment.duration())
    }
}
