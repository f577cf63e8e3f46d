//! 处理器测试共用的夹具与模拟供应商

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::application::ports::{
    BookRepositoryPort, ProviderError, StoragePort, SynthesisProvider, SynthesisRequest,
    SynthesisResponse,
};
use crate::application::registry::ProviderRegistry;
use crate::domain::book::{
    chapter_id, segment_id, Book, BookStatus, Chapter, PersonVoice, ProcessingInfo, Segment,
    SourceContext, TimestampItem, VoiceMap,
};
use crate::infrastructure::adapters::storage::FileStorage;
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::persistence::StorageBookRepository;

pub struct Fixture {
    _dir: TempDir,
    pub storage: Arc<dyn StoragePort>,
    pub repo: Arc<dyn BookRepositoryPort>,
    pub registry: Arc<ProviderRegistry>,
    pub events: Arc<EventPublisher>,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StoragePort> = Arc::new(FileStorage::new(dir.path()).await.unwrap());
        let repo: Arc<dyn BookRepositoryPort> = StorageBookRepository::new(storage.clone()).arc();

        Self {
            _dir: dir,
            storage,
            repo,
            registry: ProviderRegistry::new().arc(),
            events: EventPublisher::new().arc(),
        }
    }

    /// 写入一本指定状态的书：一章，每个 (person, text) 一个片段，
    /// 音色映射覆盖 narrator 与 dialogue
    pub async fn seed_book(&self, status: BookStatus, lines: &[(&str, &str)]) -> Book {
        let mut book = Book::new("Moby Dick", "Herman Melville", "en", "txt");
        book.status = status;
        book.total_chapters = 1;
        book.total_segments = lines.len();
        self.repo.save_book(&book).await.unwrap();

        let chapter = Chapter::new(&book.id, 1, "Loomings")
            .with_toc_path(vec!["Loomings".to_string()])
            .with_paragraphs(lines.iter().map(|(_, text)| text.to_string()).collect());
        self.repo.save_chapter(&chapter).await.unwrap();

        for (seq, (person, text)) in lines.iter().enumerate() {
            self.repo
                .save_segment(&Segment {
                    id: segment_id(1, seq),
                    book_id: book.id.clone(),
                    chapter_id: chapter_id(1),
                    text: text.to_string(),
                    language: "en".to_string(),
                    person: person.to_string(),
                    voice_description: String::new(),
                    voice_id: String::new(),
                    timestamps: None,
                    source_context: Some(SourceContext {
                        chapter_id: chapter_id(1),
                        paragraph_index: seq,
                        previous_segment_id: None,
                        next_segment_id: None,
                    }),
                    audio_path: None,
                    processing: ProcessingInfo {
                        segmenter_version: "test/1".to_string(),
                        ..Default::default()
                    },
                })
                .await
                .unwrap();
        }

        self.repo
            .save_voice_map(&VoiceMap::new(
                &book.id,
                vec![
                    PersonVoice::new("narrator", "voice-narrator"),
                    PersonVoice::new("dialogue", "voice-dialogue"),
                ],
            ))
            .await
            .unwrap();

        book
    }
}

/// 可编排的合成供应商
///
/// 音频内容为 `AUDIO:{text}`，时长 = 词数 * 0.5 秒
#[derive(Default)]
pub struct ScriptedSynth {
    /// 总是失败的文本
    pub always_fail: HashSet<String>,
    /// 文本 -> 剩余失败次数
    pub fail_times: DashMap<String, usize>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedSynth {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            always_fail: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn flaky(text: &str, failures: usize) -> Self {
        let synth = Self::default();
        synth.fail_times.insert(text.to_string(), failures);
        synth
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisProvider for ScriptedSynth {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.always_fail.contains(&request.text) {
            return Err(ProviderError::Service("scripted failure".to_string()));
        }
        if let Some(mut remaining) = self.fail_times.get_mut(&request.text) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProviderError::Timeout);
            }
        }

        let words: Vec<TimestampItem> = request
            .text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| TimestampItem {
                text: w.to_string(),
                start: i as f64 * 0.5,
                end: (i + 1) as f64 * 0.5,
            })
            .collect();

        Ok(SynthesisResponse {
            audio: format!("AUDIO:{}", request.text).into_bytes(),
            format: "wav".to_string(),
            word_timestamps: Some(words),
        })
    }

    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
