//! Backend selection by name.
//!
//! The binary only knows the `--provider` string. Each backend registers a
//! [`ProviderFactory`] under its name, and [`ProviderRegistry`] looks it up.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{BackendSettings, LlmProvider, ProviderError};

/// Builds one kind of backend.
pub trait ProviderFactory: Send + Sync {
    /// Name used on the command line, e.g. `openai`.
    fn provider_type(&self) -> &'static str;

    /// Build a backend.
    ///
    /// A missing credential is allowed: the backend starts degraded and
    /// every call fails. Settings that can never work (a bad URL) are errors.
    fn create(&self, settings: &BackendSettings) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Report anything that would leave the backend unusable, including a
    /// missing credential.
    fn validate(&self, settings: &BackendSettings) -> Result<(), ProviderError>;
}

/// Known backends, keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<&'static str, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every backend compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiProviderFactory));
        registry
    }

    /// Add a factory. A later one with the same name wins.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(factory.provider_type(), factory);
    }

    pub fn create(
        &self,
        provider_type: &str,
        settings: &BackendSettings,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = self.lookup(provider_type)?.create(settings)?;
        tracing::debug!(provider = provider.name(), "Backend created");
        Ok(provider)
    }

    pub fn validate(
        &self,
        provider_type: &str,
        settings: &BackendSettings,
    ) -> Result<(), ProviderError> {
        self.lookup(provider_type)?.validate(settings)
    }

    pub fn available_types(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    fn lookup(&self, provider_type: &str) -> Result<&dyn ProviderFactory, ProviderError> {
        self.factories
            .get(provider_type)
            .map(|f| &**f)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "no backend named '{}' (known: {})",
                    provider_type,
                    self.available_types().join(", ")
                ))
            })
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;

    /// Backend answering every claim with an empty evidence list.
    struct NoEvidence;

    #[async_trait]
    impl LlmProvider for NoEvidence {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: "[]".to_string(),
                usage: TokenUsage::default(),
                model: config.model.clone(),
                finish_reason: None,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "no-evidence"
        }
    }

    /// Needs an explicit key to validate, but builds without one.
    struct NoEvidenceFactory;

    impl ProviderFactory for NoEvidenceFactory {
        fn provider_type(&self) -> &'static str {
            "no-evidence"
        }

        fn create(&self, _settings: &BackendSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            Ok(Arc::new(NoEvidence))
        }

        fn validate(&self, settings: &BackendSettings) -> Result<(), ProviderError> {
            settings
                .api_key()
                .map(|_| ())
                .ok_or_else(|| ProviderError::NotConfigured("key required".to_string()))
        }
    }

    #[test]
    fn test_create_registered_backend() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NoEvidenceFactory));

        assert!(registry.has_provider("no-evidence"));
        assert!(!registry.has_provider("anthropic"));

        let provider = registry
            .create("no-evidence", &BackendSettings::new())
            .unwrap();
        assert_eq!(provider.name(), "no-evidence");
    }

    #[test]
    fn test_unknown_backend_lists_known_ones() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NoEvidenceFactory));

        match registry.create("llama", &BackendSettings::new()) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("'llama'"));
                assert!(msg.contains("no-evidence"));
            }
            other => panic!("expected NotConfigured, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn test_validate_is_stricter_than_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NoEvidenceFactory));

        let bare = BackendSettings::new();
        assert!(registry.create("no-evidence", &bare).is_ok());
        assert!(registry.validate("no-evidence", &bare).is_err());

        let keyed = BackendSettings::new().with_api_key("k");
        assert!(registry.validate("no-evidence", &keyed).is_ok());
        assert_eq!(registry.available_types(), vec!["no-evidence"]);
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_defaults_include_openai() {
        assert!(ProviderRegistry::with_defaults().has_provider("openai"));
    }
}
