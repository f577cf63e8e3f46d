//! Ingest Command Handlers - 上传与解析

use std::sync::Arc;

use super::lifecycle;
use crate::application::commands::{CreateBook, ParseBook};
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, ParserFactory};
use crate::domain::book::{validate_id, Book, BookStatus, Chapter};
use crate::infrastructure::events::EventPublisher;

// ============================================================================
// CreateBook
// ============================================================================

/// CreateBook Handler - 创建 uploaded 状态的记录，立即返回
pub struct CreateBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
    events: Arc<EventPublisher>,
}

impl CreateBookHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>, events: Arc<EventPublisher>) -> Self {
        Self { repo, events }
    }

    pub async fn handle(&self, command: CreateBook) -> Result<Book, ApplicationError> {
        let title = command.title.trim();
        if title.is_empty() {
            return Err(ApplicationError::validation("title cannot be empty"));
        }
        let orig_format = command.orig_format.trim().to_ascii_lowercase();
        if orig_format.is_empty() {
            return Err(ApplicationError::validation("original format cannot be empty"));
        }

        let book = Book::new(title, command.author.trim(), command.language.trim(), orig_format);
        self.repo.save_book(&book).await?;
        self.events
            .publish_status_changed(&book.id, book.status, None);

        tracing::info!(
            book_id = %book.id,
            title = %book.title,
            format = %book.orig_format,
            "Book created (uploaded)"
        );

        Ok(book)
    }
}

// ============================================================================
// ParseBook
// ============================================================================

#[derive(Debug, Clone)]
pub struct ParseBookResponse {
    pub book_id: String,
    pub total_chapters: usize,
}

/// ParseBook Handler - 文档 → 章节
///
/// 解析器失败时 Book 进入 `error`，并返回 ValidationError
pub struct ParseBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
    parsers: ParserFactory,
    events: Arc<EventPublisher>,
}

impl ParseBookHandler {
    pub fn new(
        repo: Arc<dyn BookRepositoryPort>,
        parsers: ParserFactory,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self {
            repo,
            parsers,
            events,
        }
    }

    pub async fn handle(&self, command: ParseBook) -> Result<ParseBookResponse, ApplicationError> {
        validate_id("book", &command.book_id)?;
        let mut book = self.repo.get_book(&command.book_id).await?;

        lifecycle::advance(self.repo.as_ref(), &self.events, &mut book, BookStatus::Parsing)
            .await?;

        let chapters = match self.parse(&book, &command.document).await {
            Ok(chapters) => chapters,
            Err(e) => {
                lifecycle::record_failure(self.repo.as_ref(), &self.events, &mut book, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        book.total_chapters = chapters.len();
        lifecycle::advance(self.repo.as_ref(), &self.events, &mut book, BookStatus::Segmenting)
            .await?;

        tracing::info!(
            book_id = %book.id,
            total_chapters = chapters.len(),
            "Book parsed"
        );

        Ok(ParseBookResponse {
            book_id: book.id,
            total_chapters: chapters.len(),
        })
    }

    async fn parse(&self, book: &Book, document: &[u8]) -> Result<Vec<Chapter>, ApplicationError> {
        let parser = self.parsers.get(&book.orig_format)?;
        let mut chapters = parser.parse(&book.id, document)?;
        if chapters.is_empty() {
            return Err(ApplicationError::validation("document contains no chapters"));
        }

        chapters.sort_by_key(|c| c.number);
        for chapter in &chapters {
            if chapter.book_id != book.id {
                return Err(ApplicationError::internal(format!(
                    "parser produced chapter {} for another book",
                    chapter.id
                )));
            }
            self.repo.save_chapter(chapter).await?;
        }

        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::infrastructure::adapters::parser::PlainTextParser;

    fn create(format: &str) -> CreateBook {
        CreateBook {
            title: "Moby Dick".to_string(),
            author: "Herman Melville".to_string(),
            language: "en".to_string(),
            orig_format: format.to_string(),
        }
    }

    fn parsers() -> ParserFactory {
        ParserFactory::new().register("txt", Arc::new(PlainTextParser::default()))
    }

    #[tokio::test]
    async fn test_create_book_is_uploaded() {
        let fx = Fixture::new().await;
        let handler = CreateBookHandler::new(fx.repo.clone(), fx.events.clone());

        let book = handler.handle(create("TXT")).await.unwrap();
        assert_eq!(book.status, BookStatus::Uploaded);
        assert_eq!(book.orig_format, "txt");
        assert_eq!(fx.repo.get_book(&book.id).await.unwrap(), book);

        let mut bad = create("txt");
        bad.title = "  ".to_string();
        assert!(matches!(
            handler.handle(bad).await,
            Err(ApplicationError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_book_stores_chapters() {
        let fx = Fixture::new().await;
        let book = CreateBookHandler::new(fx.repo.clone(), fx.events.clone())
            .handle(create("txt"))
            .await
            .unwrap();
        let handler = ParseBookHandler::new(fx.repo.clone(), parsers(), fx.events.clone());

        let response = handler
            .handle(ParseBook {
                book_id: book.id.clone(),
                document: b"Call me Ishmael.\n\nSome years ago.\n".to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(response.total_chapters, 1);

        let stored = fx.repo.get_book(&book.id).await.unwrap();
        assert_eq!(stored.status, BookStatus::Segmenting);
        assert_eq!(stored.total_chapters, 1);

        let chapters = fx.repo.list_chapters(&book.id).await.unwrap();
        assert_eq!(chapters[0].paragraphs.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_marks_book_error() {
        let fx = Fixture::new().await;
        let book = CreateBookHandler::new(fx.repo.clone(), fx.events.clone())
            .handle(create("pdf"))
            .await
            .unwrap();
        let handler = ParseBookHandler::new(fx.repo.clone(), parsers(), fx.events.clone());

        let result = handler
            .handle(ParseBook {
                book_id: book.id.clone(),
                document: b"%PDF-1.7".to_vec(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));

        let stored = fx.repo.get_book(&book.id).await.unwrap();
        assert_eq!(stored.status, BookStatus::Error);
        assert!(stored.error.unwrap().contains("pdf"));
    }

    #[tokio::test]
    async fn test_parse_rejects_wrong_state() {
        let fx = Fixture::new().await;
        let book = fx.seed_book(BookStatus::Ready, &[("narrator", "x")]).await;
        let handler = ParseBookHandler::new(fx.repo.clone(), parsers(), fx.events.clone());

        let result = handler
            .handle(ParseBook {
                book_id: book.id.clone(),
                document: b"text".to_vec(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::InvalidState(_))));
        assert_eq!(
            fx.repo.get_book(&book.id).await.unwrap().status,
            BookStatus::Ready
        );
    }
}
