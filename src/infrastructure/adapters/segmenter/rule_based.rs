//! Rule-based Segmenter - 不依赖 LLM 的分段供应商
//!
//! 按标点切句；以引号开头的句子归为 `dialogue`，其余归为 `narrator`。
//! 上下文段落不参与判断。

use async_trait::async_trait;

use crate::application::ports::{
    ProviderError, SegmentDraft, SegmentationProvider, SegmentationRequest,
};
use crate::domain::{is_quoted, split_paragraph, SplitConfig};

pub const NARRATOR: &str = "narrator";
pub const DIALOGUE: &str = "dialogue";

/// 规则分段器配置
#[derive(Debug, Clone)]
pub struct RuleBasedSegmenterConfig {
    pub name: String,
    /// 请求未给出语言时使用
    pub default_language: String,
    pub split: SplitConfig,
}

impl Default for RuleBasedSegmenterConfig {
    fn default() -> Self {
        Self {
            name: "rule-based".to_string(),
            default_language: "en".to_string(),
            split: SplitConfig::default(),
        }
    }
}

pub struct RuleBasedSegmenter {
    config: RuleBasedSegmenterConfig,
}

impl RuleBasedSegmenter {
    pub fn new(config: RuleBasedSegmenterConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleBasedSegmenterConfig::default())
    }
}

#[async_trait]
impl SegmentationProvider for RuleBasedSegmenter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> &str {
        "rule-based/1"
    }

    async fn segment(
        &self,
        request: SegmentationRequest,
    ) -> Result<Vec<SegmentDraft>, ProviderError> {
        let language = request
            .language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.default_language.clone());

        let drafts = split_paragraph(&request.text, &self.config.split)
            .into_iter()
            .map(|text| {
                let (person, voice_description) = if is_quoted(&text) {
                    (DIALOGUE, "character speaking")
                } else {
                    (NARRATOR, "neutral narration")
                };
                SegmentDraft {
                    text,
                    person: person.to_string(),
                    language: language.clone(),
                    voice_description: voice_description.to_string(),
                }
            })
            .collect();

        Ok(drafts)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
