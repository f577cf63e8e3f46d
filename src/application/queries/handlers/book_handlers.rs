//! Book Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, StoragePort};
use crate::application::queries::{
    GetBook, GetProcessingStatus, GetSegmentAudio, GetVoiceMap, ListBooks, ListChapters,
    ListSegments,
};
use crate::domain::book::{Book, Chapter, ProcessingStatus, Segment, VoiceMap};

/// 格式标记 → MIME
pub fn audio_content_type(format: &str) -> &'static str {
    match format {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// GetBook Handler
pub struct GetBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl GetBookHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(&self, query: GetBook) -> Result<Book, ApplicationError> {
        Ok(self.repo.get_book(&query.book_id).await?)
    }
}

/// ListBooks Handler - 按创建时间倒序
pub struct ListBooksHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl ListBooksHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(&self, _query: ListBooks) -> Result<Vec<Book>, ApplicationError> {
        let mut books = self.repo.list_books().await?;
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(books)
    }
}

/// ListChapters Handler
pub struct ListChaptersHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl ListChaptersHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(&self, query: ListChapters) -> Result<Vec<Chapter>, ApplicationError> {
        self.repo.get_book(&query.book_id).await?;
        let mut chapters = self.repo.list_chapters(&query.book_id).await?;
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }
}

/// ListSegments Handler
pub struct ListSegmentsHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl ListSegmentsHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(&self, query: ListSegments) -> Result<Vec<Segment>, ApplicationError> {
        self.repo.get_book(&query.book_id).await?;
        Ok(self.repo.list_segments(&query.book_id).await?)
    }
}

/// GetVoiceMap Handler
pub struct GetVoiceMapHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl GetVoiceMapHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(&self, query: GetVoiceMap) -> Result<VoiceMap, ApplicationError> {
        Ok(self.repo.get_voice_map(&query.book_id).await?)
    }
}

/// GetProcessingStatus Handler
pub struct GetProcessingStatusHandler {
    repo: Arc<dyn BookRepositoryPort>,
}

impl GetProcessingStatusHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>) -> Self {
        Self { repo }
    }

    pub async fn handle(
        &self,
        query: GetProcessingStatus,
    ) -> Result<ProcessingStatus, ApplicationError> {
        let book = self.repo.get_book(&query.book_id).await?;
        let segments = self.repo.list_segments(&book.id).await?;
        Ok(ProcessingStatus::from_book(&book, &segments))
    }
}

/// 片段音频
#[derive(Debug, Clone)]
pub struct SegmentAudio {
    pub audio_data: Vec<u8>,
    pub format: String,
    pub content_type: String,
}

/// GetSegmentAudio Handler
pub struct GetSegmentAudioHandler {
    repo: Arc<dyn BookRepositoryPort>,
    storage: Arc<dyn StoragePort>,
}

impl GetSegmentAudioHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>, storage: Arc<dyn StoragePort>) -> Self {
        Self { repo, storage }
    }

    pub async fn handle(&self, query: GetSegmentAudio) -> Result<SegmentAudio, ApplicationError> {
        let segment = self
            .repo
            .get_segment(&query.book_id, &query.segment_id)
            .await?;
        let path = segment
            .audio_path
            .as_deref()
            .filter(|_| segment.is_synthesized())
            .ok_or_else(|| ApplicationError::not_found("Audio", &segment.id))?;

        let audio_data = self.storage.get(path).await.map_err(|e| {
            if e.is_not_found() {
                ApplicationError::not_found("Audio", &segment.id)
            } else {
                ApplicationError::from(e)
            }
        })?;
        let format = path.rsplit('.').next().unwrap_or_default().to_string();

        Ok(SegmentAudio {
            content_type: audio_content_type(&format).to_string(),
            format,
            audio_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::Fixture;
    use crate::domain::book::BookStatus;

    #[tokio::test]
    async fn test_reads_require_existing_book() {
        let fx = Fixture::new().await;

        assert!(GetBookHandler::new(fx.repo.clone())
            .handle(GetBook { book_id: "nope".into() })
            .await
            .unwrap_err()
            .is_not_found());
        assert!(ListChaptersHandler::new(fx.repo.clone())
            .handle(ListChapters { book_id: "nope".into() })
            .await
            .unwrap_err()
            .is_not_found());
        assert!(ListSegmentsHandler::new(fx.repo.clone())
            .handle(ListSegments { book_id: "nope".into() })
            .await
            .unwrap_err()
            .is_not_found());
        assert!(GetProcessingStatusHandler::new(fx.repo.clone())
            .handle(GetProcessingStatus { book_id: "nope".into() })
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_processing_status_counts_synthesized() {
        let fx = Fixture::new().await;
        let book = fx
            .seed_book(BookStatus::Synthesizing, &[("narrator", "a"), ("narrator", "b")])
            .await;
        let mut segment = fx.repo.get_segment(&book.id, "0001-000000").await.unwrap();
        segment.apply_synthesis("v1", None, "books/x/audio/a.wav", "fake");
        fx.repo.save_segment(&segment).await.unwrap();

        let status = GetProcessingStatusHandler::new(fx.repo.clone())
            .handle(GetProcessingStatus { book_id: book.id.clone() })
            .await
            .unwrap();
        assert_eq!(status.status, BookStatus::Synthesizing);
        assert_eq!(status.total_segments, 2);
        assert_eq!(status.synthesized_segments, 1);
        assert_eq!(status.progress, 0.5);
    }

    #[tokio::test]
    async fn test_segment_audio() {
        let fx = Fixture::new().await;
        let book = fx.seed_book(BookStatus::Synthesized, &[("narrator", "a")]).await;
        let handler = GetSegmentAudioHandler::new(fx.repo.clone(), fx.storage.clone());
        let query = GetSegmentAudio {
            book_id: book.id.clone(),
            segment_id: "0001-000000".to_string(),
        };

        // 尚未合成
        assert!(handler.handle(query.clone()).await.unwrap_err().is_not_found());

        let key = format!("books/{}/audio/0001-000000.mp3", book.id);
        fx.storage.put(&key, b"ID3").await.unwrap();
        let mut segment = fx.repo.get_segment(&book.id, "0001-000000").await.unwrap();
        segment.apply_synthesis("v1", None, key, "fake");
        fx.repo.save_segment(&segment).await.unwrap();

        let audio = handler.handle(query).await.unwrap();
        assert_eq!(audio.audio_data, b"ID3".to_vec());
        assert_eq!(audio.format, "mp3");
        assert_eq!(audio.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_list_books_newest_first() {
        let fx = Fixture::new().await;
        let older = fx.seed_book(BookStatus::Ready, &[]).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = fx.seed_book(BookStatus::Ready, &[]).await;

        let books = ListBooksHandler::new(fx.repo.clone())
            .handle(ListBooks)
            .await
            .unwrap();
        let ids: Vec<&str> = books.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
    }
}
