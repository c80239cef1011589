//! Trusted peer registry.
//!
//! The registry is the set of identities allowed to submit requests. This
//! module holds the serialized document format and the immutable snapshot
//! that authorization checks read from.

mod document;
mod snapshot;

pub use document::{PeerRecord, RegistryDocument, RegistryFormatError};
pub use snapshot::{PeerEntry, RegistrySnapshot};
