//! Segmentation Adapters

mod rule_based;

pub use rule_based::{RuleBasedSegmenter, RuleBasedSegmenterConfig, DIALOGUE, NARRATOR};
