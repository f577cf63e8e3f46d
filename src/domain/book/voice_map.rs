//! Book Context - Voice Map

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 角色 → 供应商音色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonVoice {
    pub person: String,
    pub voice_id: String,
}

impl PersonVoice {
    pub fn new(person: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            person: person.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// 每本书一份的音色映射，保持录入顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMap {
    pub book_id: String,
    pub voices: Vec<PersonVoice>,
}

impl VoiceMap {
    pub fn new(book_id: impl Into<String>, voices: Vec<PersonVoice>) -> Self {
        Self {
            book_id: book_id.into(),
            voices,
        }
    }

    /// 解析角色对应的音色，同一角色出现多次时以首条为准
    pub fn resolve(&self, person: &str) -> Option<&str> {
        self.voices
            .iter()
            .find(|v| v.person == person)
            .map(|v| v.voice_id.as_str())
    }

    /// 列出映射中缺失的角色（按字典序，去重）
    pub fn missing_personas<'a, I>(&self, personas: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        personas
            .into_iter()
            .filter(|p| self.resolve(p).is_none())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
