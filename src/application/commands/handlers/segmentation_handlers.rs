//! Segmentation Command Handler - 章节段落 → 角色片段

use std::sync::Arc;

use super::lifecycle;
use crate::application::commands::SegmentBook;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, SegmentationProvider, SegmentationRequest};
use crate::application::registry::ProviderRegistry;
use crate::domain::book::{
    segment_id, validate_id, Book, BookStatus, Chapter, ProcessingInfo, Segment, SourceContext,
};
use crate::infrastructure::events::EventPublisher;

/// 默认前后文段落数
pub const DEFAULT_CONTEXT_PARAGRAPHS: usize = 2;

#[derive(Debug, Clone)]
pub struct SegmentBookResponse {
    pub book_id: String,
    pub total_segments: usize,
}

/// SegmentBook Handler
///
/// 按章节 number、段落顺序依次调用分段供应商；
/// 片段 ID 零填充，key 字典序即阅读顺序
pub struct SegmentBookHandler {
    repo: Arc<dyn BookRepositoryPort>,
    registry: Arc<ProviderRegistry>,
    events: Arc<EventPublisher>,
    context_paragraphs: usize,
}

impl SegmentBookHandler {
    pub fn new(
        repo: Arc<dyn BookRepositoryPort>,
        registry: Arc<ProviderRegistry>,
        events: Arc<EventPublisher>,
        context_paragraphs: usize,
    ) -> Self {
        Self {
            repo,
            registry,
            events,
            context_paragraphs,
        }
    }

    pub async fn handle(
        &self,
        command: SegmentBook,
    ) -> Result<SegmentBookResponse, ApplicationError> {
        validate_id("book", &command.book_id)?;
        let mut book = self.repo.get_book(&command.book_id).await?;
        if book.status != BookStatus::Segmenting {
            return Err(ApplicationError::invalid_state(format!(
                "book {} is {}, expected segmenting",
                book.id, book.status
            )));
        }
        let provider = self.registry.segmentation(&command.provider)?;

        let segments = match self.segment_chapters(&book, provider.as_ref()).await {
            Ok(segments) => segments,
            Err(e) => {
                lifecycle::record_failure(self.repo.as_ref(), &self.events, &mut book, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        book.total_segments = segments.len();
        lifecycle::advance(
            self.repo.as_ref(),
            &self.events,
            &mut book,
            BookStatus::VoiceMapping,
        )
        .await?;

        tracing::info!(
            book_id = %book.id,
            provider = %provider.name(),
            total_segments = segments.len(),
            "Book segmented"
        );

        Ok(SegmentBookResponse {
            book_id: book.id,
            total_segments: segments.len(),
        })
    }

    async fn segment_chapters(
        &self,
        book: &Book,
        provider: &dyn SegmentationProvider,
    ) -> Result<Vec<Segment>, ApplicationError> {
        let mut chapters = self.repo.list_chapters(&book.id).await?;
        chapters.sort_by_key(|c| c.number);

        let mut segments = Vec::new();
        for chapter in &chapters {
            segments.extend(self.segment_chapter(book, chapter, provider).await?);
        }
        link_neighbours(&mut segments);

        for segment in &segments {
            self.repo.save_segment(segment).await?;
        }
        Ok(segments)
    }

    async fn segment_chapter(
        &self,
        book: &Book,
        chapter: &Chapter,
        provider: &dyn SegmentationProvider,
    ) -> Result<Vec<Segment>, ApplicationError> {
        let paragraphs = &chapter.paragraphs;
        let language = Some(book.language.clone()).filter(|l| !l.is_empty());
        let mut segments = Vec::new();

        for (index, paragraph) in paragraphs.iter().enumerate() {
            let (preceding, following) = context_window(paragraphs, index, self.context_paragraphs);
            let drafts = provider
                .segment(SegmentationRequest {
                    text: paragraph.clone(),
                    preceding,
                    following,
                    language: language.clone(),
                })
                .await?;

            for draft in drafts {
                let language = if draft.language.is_empty() {
                    book.language.clone()
                } else {
                    draft.language
                };
                segments.push(Segment {
                    id: segment_id(chapter.number, segments.len()),
                    book_id: book.id.clone(),
                    chapter_id: chapter.id.clone(),
                    text: draft.text,
                    language,
                    person: draft.person,
                    voice_description: draft.voice_description,
                    voice_id: String::new(),
                    timestamps: None,
                    source_context: Some(SourceContext {
                        chapter_id: chapter.id.clone(),
                        paragraph_index: index,
                        previous_segment_id: None,
                        next_segment_id: None,
                    }),
                    audio_path: None,
                    processing: ProcessingInfo {
                        segmenter_version: format!("{}/{}", provider.name(), provider.version()),
                        ..Default::default()
                    },
                });
            }
        }

        Ok(segments)
    }
}

/// 段落 `index` 前后各至多 `size` 段
fn context_window(paragraphs: &[String], index: usize, size: usize) -> (Vec<String>, Vec<String>) {
    let start = index.saturating_sub(size);
    let end = (index + 1 + size).min(paragraphs.len());
    (
        paragraphs[start..index].to_vec(),
        paragraphs[index + 1..end].to_vec(),
    )
}

/// 按阅读顺序链接相邻片段
fn link_neighbours(segments: &mut [Segment]) {
    let ids: Vec<String> = segments.iter().map(|s| s.id.clone()).collect();
    for (i, segment) in segments.iter_mut().enumerate() {
        if let Some(ctx) = segment.source_context.as_mut() {
            ctx.previous_segment_id = i.checked_sub(1).map(|p| ids[p].clone());
            ctx.next_segment_id = ids.get(i + 1).cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::application::ports::{ProviderError, SegmentDraft};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录请求，每段落返回一个片段
    #[derive(Default)]
    struct EchoSegmenter {
        requests: Mutex<Vec<SegmentationRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl SegmentationProvider for EchoSegmenter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn segment(
            &self,
            request: SegmentationRequest,
        ) -> Result<Vec<SegmentDraft>, ProviderError> {
            if self.fail {
                return Err(ProviderError::Service("llm unavailable".to_string()));
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok(vec![SegmentDraft {
                text: request.text,
                person: "narrator".to_string(),
                language: String::new(),
                voice_description: "calm".to_string(),
            }])
        }

        async fn close(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    async fn segmenting_book(fx: &Fixture) -> Book {
        let mut book = Book::new("t", "", "en", "txt");
        book.status = BookStatus::Segmenting;
        fx.repo.save_book(&book).await.unwrap();

        let paragraphs = |prefix: &str, n: usize| {
            (0..n).map(|i| format!("{} {}", prefix, i)).collect::<Vec<_>>()
        };
        fx.repo
            .save_chapter(&Chapter::new(&book.id, 2, "Two").with_paragraphs(paragraphs("b", 1)))
            .await
            .unwrap();
        fx.repo
            .save_chapter(&Chapter::new(&book.id, 1, "One").with_paragraphs(paragraphs("a", 4)))
            .await
            .unwrap();
        book
    }

    #[test]
    fn test_context_window() {
        let p: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(context_window(&p, 0, 2), (vec![], vec!["1".into(), "2".into()]));
        assert_eq!(
            context_window(&p, 3, 2),
            (vec!["1".into(), "2".into()], vec!["4".into()])
        );
        assert_eq!(context_window(&p, 2, 0), (vec![], vec![]));
    }

    #[tokio::test]
    async fn test_segment_book_in_reading_order() {
        let fx = Fixture::new().await;
        let book = segmenting_book(&fx).await;
        let segmenter = Arc::new(EchoSegmenter::default());
        fx.registry.register_segmentation(segmenter.clone());

        let handler =
            SegmentBookHandler::new(fx.repo.clone(), fx.registry.clone(), fx.events.clone(), 1);
        let response = handler
            .handle(SegmentBook {
                book_id: book.id.clone(),
                provider: "echo".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.total_segments, 5);

        let segments = fx.repo.list_segments(&book.id).await.unwrap();
        let ids: Vec<&str> = segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["0001-000000", "0001-000001", "0001-000002", "0001-000003", "0002-000000"]
        );
        assert_eq!(segments[0].text, "a 0");
        assert_eq!(segments[4].text, "b 0");
        assert_eq!(segments[0].language, "en");
        assert_eq!(segments[0].processing.segmenter_version, "echo/1");

        let ctx = segments[3].source_context.as_ref().unwrap();
        assert_eq!(ctx.paragraph_index, 3);
        assert_eq!(ctx.previous_segment_id.as_deref(), Some("0001-000002"));
        assert_eq!(ctx.next_segment_id.as_deref(), Some("0002-000000"));
        assert!(segments[4].source_context.as_ref().unwrap().next_segment_id.is_none());

        let requests = segmenter.requests.lock().unwrap();
        assert_eq!(requests[1].preceding, vec!["a 0"]);
        assert_eq!(requests[1].following, vec!["a 2"]);

        let stored = fx.repo.get_book(&book.id).await.unwrap();
        assert_eq!(stored.status, BookStatus::VoiceMapping);
        assert_eq!(stored.total_segments, 5);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found_without_side_effects() {
        let fx = Fixture::new().await;
        let book = segmenting_book(&fx).await;
        let handler =
            SegmentBookHandler::new(fx.repo.clone(), fx.registry.clone(), fx.events.clone(), 2);

        let result = handler
            .handle(SegmentBook {
                book_id: book.id.clone(),
                provider: "missing".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
        assert_eq!(
            fx.repo.get_book(&book.id).await.unwrap().status,
            BookStatus::Segmenting
        );
    }

    #[tokio::test]
    async fn test_provider_failure_marks_book_error() {
        let fx = Fixture::new().await;
        let book = segmenting_book(&fx).await;
        fx.registry.register_segmentation(Arc::new(EchoSegmenter {
            fail: true,
            ..Default::default()
        }));
        let handler =
            SegmentBookHandler::new(fx.repo.clone(), fx.registry.clone(), fx.events.clone(), 2);

        let result = handler
            .handle(SegmentBook {
                book_id: book.id.clone(),
                provider: "echo".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::ProviderError(_))));

        let stored = fx.repo.get_book(&book.id).await.unwrap();
        assert_eq!(stored.status, BookStatus::Error);
        assert!(stored.error.is_some());
        assert!(fx.repo.list_segments(&book.id).await.unwrap().is_empty());
    }
}
