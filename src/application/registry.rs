//! Provider Registry
//!
//! 按名称持有三类供应商实例。进程启动时构造一次，
//! 显式注入到各处理器中，不使用全局单例。

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::ports::{ExtractionProvider, SegmentationProvider, SynthesisProvider};

/// 供应商能力类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Segmentation,
    Synthesis,
    Extraction,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Segmentation => "segmentation",
            ProviderKind::Synthesis => "synthesis",
            ProviderKind::Extraction => "extraction",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} provider not found: {name}")]
    NotFound { kind: ProviderKind, name: String },
}

/// 各能力已注册的供应商名称
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderNames {
    pub segmentation: Vec<String>,
    pub synthesis: Vec<String>,
    pub extraction: Vec<String>,
}

/// 供应商注册表
#[derive(Default)]
pub struct ProviderRegistry {
    segmentation: DashMap<String, Arc<dyn SegmentationProvider>>,
    synthesis: DashMap<String, Arc<dyn SynthesisProvider>>,
    extraction: DashMap<String, Arc<dyn ExtractionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册分段供应商，同名覆盖
    pub fn register_segmentation(&self, provider: Arc<dyn SegmentationProvider>) {
        let name = provider.name().to_string();
        tracing::info!(kind = "segmentation", name = %name, "Provider registered");
        self.segmentation.insert(name, provider);
    }

    /// 注册合成供应商，同名覆盖
    pub fn register_synthesis(&self, provider: Arc<dyn SynthesisProvider>) {
        let name = provider.name().to_string();
        tracing::info!(kind = "synthesis", name = %name, "Provider registered");
        self.synthesis.insert(name, provider);
    }

    /// 注册提取供应商，同名覆盖
    pub fn register_extraction(&self, provider: Arc<dyn ExtractionProvider>) {
        let name = provider.name().to_string();
        tracing::info!(kind = "extraction", name = %name, "Provider registered");
        self.extraction.insert(name, provider);
    }

    pub fn segmentation(&self, name: &str) -> Result<Arc<dyn SegmentationProvider>, RegistryError> {
        self.segmentation
            .get(name)
            .map(|p| p.value().clone())
            .ok_or_else(|| RegistryError::NotFound {
                kind: ProviderKind::Segmentation,
                name: name.to_string(),
            })
    }

    pub fn synthesis(&self, name: &str) -> Result<Arc<dyn SynthesisProvider>, RegistryError> {
        self.synthesis
            .get(name)
            .map(|p| p.value().clone())
            .ok_or_else(|| RegistryError::NotFound {
                kind: ProviderKind::Synthesis,
                name: name.to_string(),
            })
    }

    pub fn extraction(&self, name: &str) -> Result<Arc<dyn ExtractionProvider>, RegistryError> {
        self.extraction
            .get(name)
            .map(|p| p.value().clone())
            .ok_or_else(|| RegistryError::NotFound {
                kind: ProviderKind::Extraction,
                name: name.to_string(),
            })
    }

    /// 某类能力下已注册的名称（字典序）
    pub fn names(&self, kind: ProviderKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            ProviderKind::Segmentation => {
                self.segmentation.iter().map(|e| e.key().clone()).collect()
            }
            ProviderKind::Synthesis => self.synthesis.iter().map(|e| e.key().clone()).collect(),
            ProviderKind::Extraction => self.extraction.iter().map(|e| e.key().clone()).collect(),
        };
        names.sort();
        names
    }

    pub fn all_names(&self) -> ProviderNames {
        ProviderNames {
            segmentation: self.names(ProviderKind::Segmentation),
            synthesis: self.names(ProviderKind::Synthesis),
            extraction: self.names(ProviderKind::Extraction),
        }
    }

    /// 关闭所有供应商，单个失败只记录日志
    pub async fn close_all(&self) {
        // 先收集，避免跨 await 持有 DashMap 分片锁
        let segmentation: Vec<_> = self.segmentation.iter().map(|e| e.value().clone()).collect();
        let synthesis: Vec<_> = self.synthesis.iter().map(|e| e.value().clone()).collect();
        let extraction: Vec<_> = self.extraction.iter().map(|e| e.value().clone()).collect();

        for provider in segmentation {
            if let Err(e) = provider.close().await {
                tracing::warn!(name = %provider.name(), error = %e, "Failed to close provider");
            }
        }
        for provider in synthesis {
            if let Err(e) = provider.close().await {
                tracing::warn!(name = %provider.name(), error = %e, "Failed to close provider");
            }
        }
        for provider in extraction {
            if let Err(e) = provider.close().await {
                tracing::warn!(name = %provider.name(), error = %e, "Failed to close provider");
            }
        }

        tracing::info!("All providers closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ProviderError, SynthesisRequest, SynthesisResponse,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NamedSynth {
        name: String,
        closes: AtomicUsize,
    }

    impl NamedSynth {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                closes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SynthesisProvider for NamedSynth {
        fn name(&self) -> &str {
            &self.name
        }

        async fn synthesize(
            &self,
            _request: SynthesisRequest,
        ) -> Result<SynthesisResponse, ProviderError> {
            Ok(SynthesisResponse {
                audio: vec![0],
                format: "wav".to_string(),
                word_timestamps: None,
            })
        }

        async fn close(&self) -> Result<(), ProviderError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_lookup_by_name_and_kind() {
        let registry = ProviderRegistry::new();
        registry.register_synthesis(NamedSynth::new("fake"));

        assert!(registry.synthesis("fake").is_ok());

        let err = registry.synthesis("polly").err().unwrap();
        assert!(matches!(
            err,
            RegistryError::NotFound { kind: ProviderKind::Synthesis, .. }
        ));

        // 同名但不同能力
        assert!(registry.segmentation("fake").is_err());
    }

    #[test]
    fn test_names_sorted() {
        let registry = ProviderRegistry::new();
        registry.register_synthesis(NamedSynth::new("zeta"));
        registry.register_synthesis(NamedSynth::new("alpha"));

        assert_eq!(registry.names(ProviderKind::Synthesis), vec!["alpha", "zeta"]);
        assert!(registry.names(ProviderKind::Extraction).is_empty());
        assert_eq!(registry.all_names().synthesis.len(), 2);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = ProviderRegistry::new();
        let provider = NamedSynth::new("fake");
        registry.register_synthesis(provider.clone());

        registry.close_all().await;
        registry.close_all().await;

        assert_eq!(provider.closes.load(Ordering::SeqCst), 2);
    }
}
