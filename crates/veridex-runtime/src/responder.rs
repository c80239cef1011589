//! Authorization gate in front of the claim handler.
//!
//! Every inbound request passes through [`Responder::respond`]. Callers
//! missing from the trusted registry are dropped before the handler runs,
//! and the rejection carries no reason.

use std::sync::Arc;
use thiserror::Error;

use veridex_core::{AuthDecision, CallerIdentity, ClaimRequest, ClaimResponse, CoreError};

use crate::handler::ClaimHandler;
use crate::registry::TrustedRegistry;

/// Why a request never reached the handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Caller is not in the trusted registry, or sent no identity
    #[error("Caller blocked")]
    Blocked,

    /// Request failed validation
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),
}

/// Registry gate plus claim handler.
pub struct Responder {
    registry: Arc<TrustedRegistry>,
    handler: ClaimHandler,
}

impl Responder {
    /// Create a responder reading callers from `registry`.
    pub fn new(registry: Arc<TrustedRegistry>, handler: ClaimHandler) -> Self {
        Self { registry, handler }
    }

    /// Check a caller against the current registry snapshot.
    pub fn authorize(&self, identity: &CallerIdentity) -> AuthDecision {
        self.registry.authorize(identity)
    }

    /// Authorize, validate, then handle one request.
    ///
    /// A missing identity is treated like an unknown one.
    pub async fn respond(
        &self,
        caller: Option<CallerIdentity>,
        request: ClaimRequest,
    ) -> Result<ClaimResponse, Rejection> {
        let Some(caller) = caller else {
            tracing::debug!(request_id = %request.request_id, "Rejecting request without caller identity");
            return Err(Rejection::Blocked);
        };

        if self.authorize(&caller).blocked {
            return Err(Rejection::Blocked);
        }

        request.validate()?;
        let request = request.with_caller(caller);
        Ok(self.handler.handle(&request).await)
    }

    /// The shared registry this responder reads.
    pub fn registry(&self) -> &Arc<TrustedRegistry> {
        &self.registry
    }

    /// The handler requests are passed to.
    pub fn handler(&self) -> &ClaimHandler {
        &self.handler
    }
}
