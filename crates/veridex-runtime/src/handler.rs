//! Request handler for claim evidence retrieval.
//!
//! The handler takes an already-authorized claim and:
//! - builds the backend instructions
//! - makes exactly one backend call
//! - parses the reply into evidence
//! - echoes the request id into a response
//!
//! It never fails the request. Backend and parse failures are logged and
//! the caller gets a well-formed response with no evidence.

use std::sync::Arc;
use thiserror::Error;

use veridex_core::{
    build_query, parse_reply, BackendQuery, ClaimRequest, ClaimResponse, EvidenceItem,
    MalformedReply, ParsedReply,
};

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};

/// Why a request produced no evidence.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Backend call failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("Backend reply unusable: {reason}")]
    Malformed { reason: MalformedReply, raw: String },

    #[error("Handler not configured: {0}")]
    NotConfigured(String),
}

/// Convert backend instructions into the chat messages sent to a provider.
pub fn query_messages(query: BackendQuery) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(query.system_instruction),
        ChatMessage::user(query.user_instruction),
    ]
}

/// Turns claims into evidence responses.
pub struct ClaimHandler {
    /// Model backend
    provider: Arc<dyn LlmProvider>,

    /// Settings for every backend call
    completion: CompletionConfig,
}

impl ClaimHandler {
    /// Create a handler over `provider`.
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
        }
    }

    /// Handle one claim.
    ///
    /// Assumes the caller has already passed authorization.
    pub async fn handle(&self, request: &ClaimRequest) -> ClaimResponse {
        let request_id = request.request_id.as_str();
        tracing::info!(request_id, "Received evidence request");
        tracing::info!(request_id, statement = %request.statement, "Statement");
        if !request.preferred_sources.is_empty() {
            tracing::info!(
                request_id,
                sources = ?request.preferred_sources,
                "Preferred sources"
            );
        }

        match self.fetch_evidence(request).await {
            Ok(evidence) => {
                tracing::info!(
                    request_id,
                    count = evidence.len(),
                    "Returning evidence items"
                );
                ClaimResponse::with_evidence(request_id, evidence)
            }
            Err(HandlerError::Malformed { reason, raw }) => {
                tracing::error!(request_id, raw_reply = %raw, "Raw text of backend reply");
                tracing::error!(request_id, error = %reason, "Backend reply unusable");
                ClaimResponse::empty(request_id)
            }
            Err(e) => {
                tracing::error!(
                    request_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Error calling backend"
                );
                ClaimResponse::empty(request_id)
            }
        }
    }

    /// The fallible part of [`ClaimHandler::handle`], with each failure explicit.
    pub async fn fetch_evidence(
        &self,
        request: &ClaimRequest,
    ) -> Result<Vec<EvidenceItem>, HandlerError> {
        let query = build_query(&request.statement, &request.preferred_sources);

        tracing::info!(
            request_id = %request.request_id,
            provider = self.provider.name(),
            model = %self.completion.model,
            "Calling backend"
        );
        let reply = self
            .provider
            .complete(query_messages(query), &self.completion)
            .await?;
        tracing::info!(
            request_id = %request.request_id,
            tokens = reply.usage.total(),
            "Received backend reply"
        );

        match parse_reply(&reply.content) {
            ParsedReply::Evidence(items) => Ok(items),
            ParsedReply::Malformed(reason) => Err(HandlerError::Malformed {
                reason,
                raw: reply.content,
            }),
        }
    }

    /// Settings used for backend calls.
    pub fn completion_config(&self) -> &CompletionConfig {
        &self.completion
    }

    /// Name of the backend provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether the backend reports itself usable. Makes no backend call.
    pub async fn backend_ready(&self) -> bool {
        self.provider.health_check().await
    }
}

/// Builder for ClaimHandler.
pub struct ClaimHandlerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    completion: CompletionConfig,
}

impl ClaimHandlerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            provider: None,
            completion: CompletionConfig::default(),
        }
    }

    /// Set the model backend.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the completion settings.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Build the handler.
    pub fn build(self) -> Result<ClaimHandler, HandlerError> {
        let provider = self
            .provider
            .ok_or_else(|| HandlerError::NotConfigured("No provider set".to_string()))?;
        Ok(ClaimHandler::new(provider, self.completion))
    }
}

impl Default for ClaimHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
