//! Caller authorization against the trusted registry.
//!
//! Runs on every inbound request before any handler work, so it is a plain
//! in-memory lookup with no I/O.

use crate::registry::RegistrySnapshot;
use crate::types::CallerIdentity;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    /// Whether the request must be dropped
    pub blocked: bool,

    /// Reason disclosed to the caller, if any
    pub reason: Option<String>,
}

impl AuthDecision {
    /// Admit the request.
    pub fn allow() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }

    /// Reject the request without telling the caller why.
    pub fn block_silently() -> Self {
        Self {
            blocked: true,
            reason: None,
        }
    }
}

/// Decide whether `identity` may submit requests.
///
/// Unregistered identities are blocked with no reason, so the reject path
/// reveals nothing about registry membership. Registered identities are
/// always admitted here.
pub fn authorize(identity: &CallerIdentity, snapshot: &RegistrySnapshot) -> AuthDecision {
    if !snapshot.contains(identity) {
        tracing::trace!(caller = %identity, "Blacklisting unrecognized caller");
        return AuthDecision::block_silently();
    }

    tracing::trace!(caller = %identity, "Admitting recognized caller");
    AuthDecision::allow()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_caller_allowed() {
        let snapshot = RegistrySnapshot::from_identities(1, ["hk-validator"]);
        let decision = authorize(&CallerIdentity::new("hk-validator"), &snapshot);
        assert_eq!(decision, AuthDecision::allow());
    }

    #[test]
    fn test_unknown_caller_blocked_without_reason() {
        let snapshot = RegistrySnapshot::from_identities(1, ["hk-validator"]);
        let decision = authorize(&CallerIdentity::new("hk-stranger"), &snapshot);
        assert!(decision.blocked);
        assert!(decision.reason.is_none());
    }

    #[test]
    fn test_empty_registry_blocks_everyone() {
        let decision = authorize(&CallerIdentity::new("hk-any"), &RegistrySnapshot::empty());
        assert!(decision.blocked);
    }

    #[test]
    fn test_identity_match_is_exact() {
        let snapshot = RegistrySnapshot::from_identities(1, ["hk-validator"]);
        assert!(authorize(&CallerIdentity::new("HK-VALIDATOR"), &snapshot).blocked);
        assert!(authorize(&CallerIdentity::new("hk-validator "), &snapshot).blocked);
    }
}
