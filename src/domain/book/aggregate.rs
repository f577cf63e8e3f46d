//! Book Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BookStatus, DomainError};

/// Book 聚合根
///
/// 不变量:
/// - status 只能按流水线顺序推进（见 [`BookStatus::can_transition_to`]）
/// - status 为 `synthesis_error` / `error` 时 error 有值
/// - total_chapters / total_segments 为冗余计数，由对应阶段写入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub language: String,
    /// 原始文件格式（txt / pdf / epub ...）
    #[serde(default)]
    pub orig_format: String,
    pub status: BookStatus,
    #[serde(default)]
    pub total_chapters: usize,
    #[serde(default)]
    pub total_segments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// 创建新书（status = uploaded）
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        language: impl Into<String>,
        orig_format: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            author: author.into(),
            language: language.into(),
            orig_format: orig_format.into(),
            status: BookStatus::Uploaded,
            total_chapters: 0,
            total_segments: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 推进到下一状态
    ///
    /// 进入非错误状态时清空 error
    pub fn transition_to(&mut self, next: BookStatus) -> Result<(), DomainError> {
        self.status.check_transition(next)?;
        self.status = next;
        if !matches!(next, BookStatus::Error | BookStatus::SynthesisError) {
            self.error = None;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 合成前阶段失败，进入 `error`
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(BookStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// 合成失败，进入 `synthesis_error`
    pub fn fail_synthesis(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(BookStatus::SynthesisError)?;
        self.error = Some(message.into());
        Ok(())
    }

    pub fn is_ready_for_synthesis(&self) -> bool {
        self.status == BookStatus::Ready
    }

    pub fn is_synthesized(&self) -> bool {
        self.status == BookStatus::Synthesized
    }
}
