//! Voice Map Command Handler - 角色 → 音色

use std::sync::Arc;

use super::lifecycle;
use crate::application::commands::AssignVoices;
use crate::application::error::ApplicationError;
use crate::application::ports::BookRepositoryPort;
use crate::domain::book::{validate_id, BookStatus, VoiceMap};
use crate::infrastructure::events::EventPublisher;

/// AssignVoices Handler
///
/// 书中出现的每个角色都必须有映射，否则返回 ValidationError 且不写入。
/// `ready` 状态下可重新分配，状态保持 `ready`。
pub struct AssignVoicesHandler {
    repo: Arc<dyn BookRepositoryPort>,
    events: Arc<EventPublisher>,
}

impl AssignVoicesHandler {
    pub fn new(repo: Arc<dyn BookRepositoryPort>, events: Arc<EventPublisher>) -> Self {
        Self { repo, events }
    }

    pub async fn handle(&self, command: AssignVoices) -> Result<VoiceMap, ApplicationError> {
        validate_id("book", &command.book_id)?;
        let mut book = self.repo.get_book(&command.book_id).await?;
        if !matches!(book.status, BookStatus::VoiceMapping | BookStatus::Ready) {
            return Err(ApplicationError::invalid_state(format!(
                "book {} is {}, voices can only be assigned before synthesis",
                book.id, book.status
            )));
        }

        if let Some(entry) = command
            .voices
            .iter()
            .find(|v| v.person.trim().is_empty() || v.voice_id.trim().is_empty())
        {
            return Err(ApplicationError::validation(format!(
                "voice map entry has empty persona or voice: {:?}",
                entry
            )));
        }

        let voice_map = VoiceMap::new(&book.id, command.voices);
        let segments = self.repo.list_segments(&book.id).await?;
        let missing = voice_map.missing_personas(segments.iter().map(|s| s.person.as_str()));
        if !missing.is_empty() {
            return Err(ApplicationError::validation(format!(
                "no voice assigned for personas: {}",
                missing.join(", ")
            )));
        }

        self.repo.save_voice_map(&voice_map).await?;
        if book.status == BookStatus::VoiceMapping {
            lifecycle::advance(self.repo.as_ref(), &self.events, &mut book, BookStatus::Ready)
                .await?;
        }

        tracing::info!(
            book_id = %book.id,
            voices = voice_map.voices.len(),
            "Voice map assigned"
        );

        Ok(voice_map)
    }
}
