//! Model backends.
//!
//! The handler talks to a backend only through [`LlmProvider`]: a list of
//! chat messages in, one block of reply text out. The OpenAI-compatible
//! client lives behind the `openai` feature.
//!
//! Credentials go through [`secrets`] and are never logged.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "openai")]
pub use openai::{OpenAiProvider, OpenAiProviderFactory, OPENAI_API_KEY_ENV};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Every way a backend call can fail.
///
/// The handler recovers all of them as "no evidence"; none reach the caller.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limited by backend, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Backend returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed response envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Backend returned no choices")]
    EmptyChoices,

    #[error("Backend rejected the API key")]
    AuthError,

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// Per-call settings.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,

    /// Reply length cap; the backend's own default when unset
    pub max_tokens: Option<u32>,

    pub temperature: f32,

    /// Client-side limit on the whole call
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: 0.2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CompletionConfig {
    /// Defaults with a specific model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What a backend client needs beyond the per-call settings.
#[derive(Debug, Default)]
pub struct BackendSettings {
    api_key: Option<SecretString>,

    /// Endpoint override, e.g. a local proxy
    pub base_url: Option<String>,
}

impl BackendSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this key instead of the backend's environment variable.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// The explicitly configured key, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A backend reply.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Reply text, trimmed
    pub content: String,

    pub usage: TokenUsage,

    /// Model that actually answered
    pub model: String,

    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Sum of both counts, saturating. The counts come from the backend.
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A model backend.
///
/// Called once per request by the handler, never retried.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `messages` and wait for the whole reply.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Whether the backend looks usable, without calling it.
    async fn health_check(&self) -> bool;

    /// Short name for logs.
    fn name(&self) -> &str;
}
