//! Book Context - Value Objects

use serde::{Deserialize, Serialize};

use super::DomainError;

/// 书籍处理状态
///
/// 流水线:
/// `uploaded → parsing → segmenting → voice_mapping → ready → synthesizing → {synthesized | synthesis_error}`
///
/// `error` 可从合成之前的任意阶段进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Uploaded,
    Parsing,
    Segmenting,
    VoiceMapping,
    Ready,
    Synthesizing,
    Synthesized,
    SynthesisError,
    Error,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Uploaded => "uploaded",
            BookStatus::Parsing => "parsing",
            BookStatus::Segmenting => "segmenting",
            BookStatus::VoiceMapping => "voice_mapping",
            BookStatus::Ready => "ready",
            BookStatus::Synthesizing => "synthesizing",
            BookStatus::Synthesized => "synthesized",
            BookStatus::SynthesisError => "synthesis_error",
            BookStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(BookStatus::Uploaded),
            "parsing" => Some(BookStatus::Parsing),
            "segmenting" => Some(BookStatus::Segmenting),
            "voice_mapping" => Some(BookStatus::VoiceMapping),
            "ready" => Some(BookStatus::Ready),
            "synthesizing" => Some(BookStatus::Synthesizing),
            "synthesized" => Some(BookStatus::Synthesized),
            "synthesis_error" => Some(BookStatus::SynthesisError),
            "error" => Some(BookStatus::Error),
            _ => None,
        }
    }

    /// 合成阶段之前的状态（可转入 `error`）
    pub fn is_pre_synthesis(&self) -> bool {
        matches!(
            self,
            BookStatus::Uploaded
                | BookStatus::Parsing
                | BookStatus::Segmenting
                | BookStatus::VoiceMapping
                | BookStatus::Ready
        )
    }

    /// 状态迁移规则
    pub fn can_transition_to(&self, next: BookStatus) -> bool {
        use BookStatus::*;

        match (self, next) {
            (Uploaded, Parsing) => true,
            (Parsing, Segmenting) => true,
            (Segmenting, VoiceMapping) => true,
            (VoiceMapping, Ready) => true,
            // 重新分配音色
            (Ready, VoiceMapping) => true,
            (Ready, Synthesizing) => true,
            // 断点续合成
            (Synthesizing, Synthesizing) | (SynthesisError, Synthesizing) => true,
            (Synthesizing, Synthesized) | (Synthesizing, SynthesisError) => true,
            (from, Error) => from.is_pre_synthesis(),
            _ => false,
        }
    }

    /// 校验迁移，非法时返回领域错误
    pub fn check_transition(&self, next: BookStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl Default for BookStatus {
    fn default() -> Self {
        BookStatus::Uploaded
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 校验实体标识
///
/// 标识会直接拼入存储 key，因此不能为空，也不能包含 `/` 或 `..`
pub fn validate_id(kind: &'static str, id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::Validation(format!("{} id cannot be empty", kind)));
    }
    if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
        return Err(DomainError::Validation(format!(
            "{} id contains illegal characters: {}",
            kind, id
        )));
    }
    Ok(())
}
