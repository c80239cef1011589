//! # veridex-runtime
//!
//! Async pieces of the Veridex responder: model backends, the shared trusted
//! registry, the request handler, and the background service loop.
//!
//! ## Request path
//!
//! ```text
//! caller ─► Responder::respond ─► authorize (TrustedRegistry snapshot)
//!                              └► ClaimHandler::handle ─► build_query
//!                                                      ├► LlmProvider::complete (once)
//!                                                      └► parse_reply ─► ClaimResponse
//! ```
//!
//! Backend and parse failures never surface as errors to the caller; they
//! produce a response with no evidence.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use veridex_runtime::{ClaimHandlerBuilder, Responder, TrustedRegistry};
//! use veridex_runtime::providers::OpenAiProvider;
//!
//! let provider = Arc::new(OpenAiProvider::from_env()?);
//! let handler = ClaimHandlerBuilder::new().provider(provider).build()?;
//! let responder = Responder::new(Arc::new(TrustedRegistry::default()), handler);
//!
//! let response = responder.respond(Some(caller), request).await?;
//! ```

pub mod handler;
pub mod providers;
pub mod registry;
pub mod responder;
pub mod service;

pub use handler::{query_messages, ClaimHandler, ClaimHandlerBuilder, HandlerError};
pub use providers::{
    ApiCredential, BackendSettings, ChatMessage, CompletionConfig, LlmProvider, ProviderError,
    ProviderRegistry,
};
pub use registry::{
    FileRegistrySource, RegistryError, RegistrySource, StaticRegistrySource, TrustedRegistry,
};
pub use responder::{Rejection, Responder};
pub use service::{
    ServiceConfig, ServiceError, ServiceHandle, ServiceLoop, ServiceState, ServiceStatus,
};
