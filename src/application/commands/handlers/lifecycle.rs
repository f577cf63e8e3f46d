//! 状态迁移的持久化与事件广播

use crate::application::error::ApplicationError;
use crate::application::ports::BookRepositoryPort;
use crate::domain::book::{Book, BookStatus};
use crate::infrastructure::events::EventPublisher;

/// 迁移到 `next`，持久化并广播
pub(super) async fn advance(
    repo: &dyn BookRepositoryPort,
    events: &EventPublisher,
    book: &mut Book,
    next: BookStatus,
) -> Result<(), ApplicationError> {
    let from = book.status;
    book.transition_to(next)?;
    repo.save_book(book).await?;
    events.publish_status_changed(&book.id, book.status, None);

    tracing::info!(book_id = %book.id, from = %from, to = %next, "Book status changed");
    Ok(())
}

/// 合成前阶段失败，记录到 `error`
///
/// 持久化失败只记录日志，原始错误仍返回给调用方
pub(super) async fn record_failure(
    repo: &dyn BookRepositoryPort,
    events: &EventPublisher,
    book: &mut Book,
    message: &str,
) {
    if let Err(e) = book.fail(message) {
        tracing::warn!(book_id = %book.id, error = %e, "Cannot mark book as failed");
        return;
    }
    if let Err(e) = repo.save_book(book).await {
        tracing::error!(book_id = %book.id, error = %e, "Failed to persist book failure");
        return;
    }
    events.publish_status_changed(&book.id, book.status, book.error.as_deref());

    tracing::warn!(book_id = %book.id, error = %message, "Book processing failed");
}
