//! # veridex-core
//!
//! Deterministic building blocks of the Veridex evidence responder.
//!
//! This crate answers three questions for every inbound claim:
//! - May this caller submit requests at all?
//! - What exactly do we ask the model backend?
//! - Which parts of the backend's reply are usable evidence?
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: Authorization, query building, and parsing are pure
//! 2. **Never panics on backend output**: Any reply text yields a [`ParsedReply`]
//! 3. **Silent rejection**: Blocked callers get no reason text
//! 4. **Order-preserving**: Evidence keeps the backend's order, no ranking
//!
//! ## Example
//!
//! ```rust
//! use veridex_core::{build_query, parse_reply, ParsedReply};
//!
//! let query = build_query("The Earth orbits the Sun", &[]);
//! assert!(query.user_instruction.contains("The Earth orbits the Sun"));
//!
//! let reply = r#"[{"url": "http://x.org/a", "snippet": "Earth orbits the Sun"}]"#;
//! match parse_reply(reply) {
//!     ParsedReply::Evidence(items) => assert_eq!(items[0].excerpt, "Earth orbits the Sun"),
//!     ParsedReply::Malformed(reason) => panic!("unexpected: {}", reason),
//! }
//! ```

pub mod authorization;
pub mod parser;
pub mod prompts;
pub mod registry;
pub mod types;

// Re-export main types at crate root
pub use authorization::{authorize, AuthDecision};
pub use parser::{parse_reply, strip_code_fence, MalformedReply, ParsedReply};
pub use prompts::{build_query, BackendQuery, EVIDENCE_SYSTEM_PROMPT};
pub use registry::{PeerEntry, PeerRecord, RegistryDocument, RegistryFormatError, RegistrySnapshot};
pub use types::{CallerIdentity, ClaimRequest, ClaimResponse, EvidenceItem};

use thiserror::Error;

/// Errors raised by core request checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
