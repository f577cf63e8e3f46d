//! Storage-backed Book Repository
//!
//! 每个实体序列化为 JSON，写到由标识派生的固定 key：
//!
//! | 实体     | key                                        |
//! |----------|--------------------------------------------|
//! | Book     | `books/{bookID}/book.json`                 |
//! | Chapter  | `books/{bookID}/chapters/{chapterID}.json` |
//! | Segment  | `books/{bookID}/segments/{segmentID}.json` |
//! | VoiceMap | `books/{bookID}/voice-map.json`            |

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::application::ports::{
    keys, BookRepositoryPort, BookUpdate, RepositoryError, StorageError, StoragePort,
};
use crate::domain::book::{validate_id, Book, Chapter, Segment, VoiceMap};

/// 基于 StoragePort 的 Book 仓储
pub struct StorageBookRepository {
    storage: Arc<dyn StoragePort>,
}

impl StorageBookRepository {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.storage
            .put(key, &bytes)
            .await
            .map_err(RepositoryError::Storage)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        key: &str,
        resource_type: &'static str,
        id: &str,
    ) -> Result<T, RepositoryError> {
        let bytes = self.storage.get(key).await.map_err(|e| match e {
            StorageError::NotFound(_) => RepositoryError::not_found(resource_type, id),
            other => RepositoryError::Storage(other),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 读取前缀下的所有 JSON 记录（按 key 字典序）
    async fn read_all<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, RepositoryError> {
        let keys = self
            .storage
            .list(prefix)
            .await
            .map_err(RepositoryError::Storage)?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|k| k.ends_with(".json")) {
            let bytes = self
                .storage
                .get(key)
                .await
                .map_err(RepositoryError::Storage)?;
            records.push(serde_json::from_slice(&bytes)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl BookRepositoryPort for StorageBookRepository {
    async fn save_book(&self, book: &Book) -> Result<(), RepositoryError> {
        validate_id("book", &book.id)?;
        self.write(&keys::book(&book.id), book).await?;

        tracing::debug!(book_id = %book.id, status = %book.status, "Book saved");
        Ok(())
    }

    async fn get_book(&self, book_id: &str) -> Result<Book, RepositoryError> {
        validate_id("book", book_id)?;
        self.read(&keys::book(book_id), "Book", book_id).await
    }

    async fn update_book(
        &self,
        book_id: &str,
        update: BookUpdate,
    ) -> Result<Book, RepositoryError> {
        let mut book = self.get_book(book_id).await?;
        update.apply(&mut book);
        book.updated_at = Utc::now();
        self.save_book(&book).await?;
        Ok(book)
    }

    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let keys = self
            .storage
            .list(keys::BOOKS_PREFIX)
            .await
            .map_err(RepositoryError::Storage)?;

        let mut books = Vec::new();
        for key in keys.iter().filter(|k| k.ends_with("/book.json")) {
            let bytes = self
                .storage
                .get(key)
                .await
                .map_err(RepositoryError::Storage)?;
            books.push(serde_json::from_slice::<Book>(&bytes)?);
        }
        Ok(books)
    }

    async fn save_chapter(&self, chapter: &Chapter) -> Result<(), RepositoryError> {
        validate_id("book", &chapter.book_id)?;
        validate_id("chapter", &chapter.id)?;
        self.write(&keys::chapter(&chapter.book_id, &chapter.id), chapter)
            .await
    }

    async fn get_chapter(
        &self,
        book_id: &str,
        chapter_id: &str,
    ) -> Result<Chapter, RepositoryError> {
        validate_id("book", book_id)?;
        validate_id("chapter", chapter_id)?;
        self.read(&keys::chapter(book_id, chapter_id), "Chapter", chapter_id)
            .await
    }

    async fn list_chapters(&self, book_id: &str) -> Result<Vec<Chapter>, RepositoryError> {
        validate_id("book", book_id)?;
        self.read_all(&keys::chapters_prefix(book_id)).await
    }

    async fn save_segment(&self, segment: &Segment) -> Result<(), RepositoryError> {
        validate_id("book", &segment.book_id)?;
        validate_id("segment", &segment.id)?;
        self.write(&keys::segment(&segment.book_id, &segment.id), segment)
            .await
    }

    async fn get_segment(
        &self,
        book_id: &str,
        segment_id: &str,
    ) -> Result<Segment, RepositoryError> {
        validate_id("book", book_id)?;
        validate_id("segment", segment_id)?;
        self.read(&keys::segment(book_id, segment_id), "Segment", segment_id)
            .await
    }

    async fn list_segments(&self, book_id: &str) -> Result<Vec<Segment>, RepositoryError> {
        validate_id("book", book_id)?;
        self.read_all(&keys::segments_prefix(book_id)).await
    }

    async fn save_voice_map(&self, voice_map: &VoiceMap) -> Result<(), RepositoryError> {
        validate_id("book", &voice_map.book_id)?;
        self.write(&keys::voice_map(&voice_map.book_id), voice_map)
            .await
    }

    async fn get_voice_map(&self, book_id: &str) -> Result<VoiceMap, RepositoryError> {
        validate_id("book", book_id)?;
        self.read(&keys::voice_map(book_id), "VoiceMap", book_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::{
        chapter_id, segment_id, BookStatus, PersonVoice, ProcessingInfo, SourceContext,
        TimestampItem, Timestamps,
    };
    use crate::infrastructure::adapters::storage::FileStorage;
    use tempfile::tempdir;

    async fn repo(dir: &tempfile::TempDir) -> StorageBookRepository {
        let storage = FileStorage::new(dir.path()).await.unwrap();
        StorageBookRepository::new(Arc::new(storage))
    }

    fn segment(book_id: &str, chapter: usize, seq: usize) -> Segment {
        Segment {
            id: segment_id(chapter, seq),
            book_id: book_id.to_string(),
            chapter_id: chapter_id(chapter),
            text: format!("sentence {}", seq),
            language: "en".to_string(),
            person: "narrator".to_string(),
            voice_description: "calm".to_string(),
            voice_id: String::new(),
            timestamps: Some(Timestamps::words(vec![TimestampItem {
                text: "sentence".to_string(),
                start: 0.0,
                end: 0.5,
            }])),
            source_context: Some(SourceContext {
                chapter_id: chapter_id(chapter),
                paragraph_index: 0,
                previous_segment_id: None,
                next_segment_id: Some(segment_id(chapter, seq + 1)),
            }),
            audio_path: None,
            processing: ProcessingInfo {
                segmenter_version: "rule-based/1".to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_book_round_trip() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let book = Book::new("Moby Dick", "Herman Melville", "en", "txt");
        repo.save_book(&book).await.unwrap();

        let loaded = repo.get_book(&book.id).await.unwrap();
        assert_eq!(loaded, book);
    }

    #[tokio::test]
    async fn test_update_book_touches_only_given_fields() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let book = Book::new("Moby Dick", "Herman Melville", "en", "txt");
        repo.save_book(&book).await.unwrap();

        let updated = repo
            .update_book(
                &book.id,
                BookUpdate::status(BookStatus::Parsing).with_total_chapters(3),
            )
            .await
            .unwrap();

        let loaded = repo.get_book(&book.id).await.unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.status, BookStatus::Parsing);
        assert_eq!(loaded.total_chapters, 3);
        assert_eq!(loaded.title, book.title);
        assert_eq!(loaded.author, book.author);
        assert_eq!(loaded.total_segments, 0);
        assert_eq!(loaded.created_at, book.created_at);
    }

    #[tokio::test]
    async fn test_missing_entities_are_not_found() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        assert!(matches!(
            repo.get_book("nope").await,
            Err(RepositoryError::NotFound { resource_type: "Book", .. })
        ));
        assert!(matches!(
            repo.get_chapter("nope", "ch-0001").await,
            Err(RepositoryError::NotFound { resource_type: "Chapter", .. })
        ));
        assert!(matches!(
            repo.get_segment("nope", "0001-000000").await,
            Err(RepositoryError::NotFound { resource_type: "Segment", .. })
        ));
        assert!(matches!(
            repo.get_voice_map("nope").await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update_book("nope", BookUpdate::default()).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_chapter_and_voice_map_round_trip() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let chapter = Chapter::new("b1", 1, "Loomings")
            .with_toc_path(vec!["Part I".to_string(), "Loomings".to_string()])
            .with_paragraphs(vec!["Call me Ishmael.".to_string()]);
        repo.save_chapter(&chapter).await.unwrap();
        assert_eq!(repo.get_chapter("b1", &chapter.id).await.unwrap(), chapter);

        let map = VoiceMap::new("b1", vec![PersonVoice::new("narrator", "v1")]);
        repo.save_voice_map(&map).await.unwrap();
        assert_eq!(repo.get_voice_map("b1").await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_segments_listed_in_stable_order() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        for (chapter, seq) in [(2, 0), (1, 1), (1, 0), (1, 10)] {
            repo.save_segment(&segment("b1", chapter, seq)).await.unwrap();
        }

        let ids: Vec<String> = repo
            .list_segments("b1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["0001-000000", "0001-000001", "0001-000010", "0002-000000"]);

        let loaded = repo.get_segment("b1", "0001-000010").await.unwrap();
        assert_eq!(loaded, segment("b1", 1, 10));
    }

    #[tokio::test]
    async fn test_segment_timestamps_survive_exactly() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let ends = [
            243.63785714295614,
            1393.7667142858159,
            0.1 + 0.2,
            2.0_f64.sqrt() * 1000.0,
            1.0 / 3.0,
        ];
        let mut expected = Vec::new();
        for (seq, end) in ends.iter().enumerate() {
            let mut seg = segment("b1", 1, seq);
            seg.timestamps = Some(Timestamps::words(vec![
                TimestampItem {
                    text: "first".to_string(),
                    start: end / 7.0,
                    end: end / 3.0,
                },
                TimestampItem {
                    text: "last".to_string(),
                    start: end / 3.0,
                    end: *end,
                },
            ]));
            repo.save_segment(&seg).await.unwrap();
            expected.push(seg);
        }

        for seg in &expected {
            let loaded = repo.get_segment("b1", &seg.id).await.unwrap();
            assert_eq!(&loaded, seg);
            assert_eq!(loaded.duration().to_bits(), seg.duration().to_bits());
        }
        assert_eq!(repo.list_segments("b1").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_list_books_ignores_other_records() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let a = Book::new("A", "", "en", "txt");
        let b = Book::new("B", "", "en", "txt");
        repo.save_book(&a).await.unwrap();
        repo.save_book(&b).await.unwrap();
        repo.save_chapter(&Chapter::new(&a.id, 1, "one")).await.unwrap();

        let books = repo.list_books().await.unwrap();
        assert_eq!(books.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let dir = tempdir().unwrap();
        let repo = repo(&dir).await;

        let mut book = Book::new("t", "", "en", "txt");
        book.id = "../etc".to_string();
        assert!(matches!(
            repo.save_book(&book).await,
            Err(RepositoryError::Validation(_))
        ));
    }
}
