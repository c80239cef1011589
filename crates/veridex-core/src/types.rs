//! Request and response contracts exchanged with callers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::CoreError;

/// Opaque identity presented by a caller (e.g., a peer hotkey address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Wrap a raw identity string.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// The raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CallerIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A factual claim submitted for evidence retrieval.
///
/// The caller identity is never read from the request body. The transport
/// attaches it from the authenticated channel via [`ClaimRequest::with_caller`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Opaque identifier echoed back in the response
    pub request_id: String,

    /// The statement to find evidence for
    pub statement: String,

    /// Sources the caller would like prioritized, in order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub preferred_sources: Vec<String>,

    /// Identity of the caller, set by the transport
    #[serde(skip)]
    pub caller_identity: Option<CallerIdentity>,
}

impl ClaimRequest {
    /// Create a request with no preferred sources.
    pub fn new(request_id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            statement: statement.into(),
            preferred_sources: Vec::new(),
            caller_identity: None,
        }
    }

    /// Set the preferred source hints.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the caller identity taken from the transport.
    pub fn with_caller(mut self, identity: CallerIdentity) -> Self {
        self.caller_identity = Some(identity);
        self
    }

    /// Check the request shape before it is handed to the handler.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.statement.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "statement must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One supporting or contradicting citation.
///
/// Both fields are non-empty and trimmed. Construct through
/// [`EvidenceItem::new`], which enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source location
    pub url: String,

    /// Text taken from the source
    pub excerpt: String,
}

impl EvidenceItem {
    /// Build an item from untrimmed parts.
    ///
    /// Returns `None` if either part is blank after trimming.
    pub fn new(url: &str, excerpt: &str) -> Option<Self> {
        let url = url.trim();
        let excerpt = excerpt.trim();
        if url.is_empty() || excerpt.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            excerpt: excerpt.to_string(),
        })
    }
}

/// Response returned to the caller for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Echoed from the request
    pub request_id: String,

    /// Citations in the order the backend produced them
    pub evidence: Vec<EvidenceItem>,
}

impl ClaimResponse {
    /// A structurally valid response carrying no evidence.
    pub fn empty(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            evidence: Vec::new(),
        }
    }

    /// Response carrying the given evidence.
    pub fn with_evidence(request_id: impl Into<String>, evidence: Vec<EvidenceItem>) -> Self {
        Self {
            request_id: request_id.into(),
            evidence,
        }
    }

    /// Whether the response carries no evidence.
    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_sources_absent_means_empty() {
        let req: ClaimRequest =
            serde_json::from_str(r#"{"request_id":"r1","statement":"Water boils at 100C"}"#)
                .unwrap();
        assert!(req.preferred_sources.is_empty());
        assert!(req.caller_identity.is_none());
    }

    #[test]
    fn test_request_sources_null_means_empty() {
        let req: ClaimRequest = serde_json::from_str(
            r#"{"request_id":"r1","statement":"x","preferred_sources":null}"#,
        )
        .unwrap();
        assert!(req.preferred_sources.is_empty());
    }

    #[test]
    fn test_request_body_cannot_set_caller() {
        let req: ClaimRequest = serde_json::from_str(
            r#"{"request_id":"r1","statement":"x","caller_identity":"spoofed"}"#,
        )
        .unwrap();
        assert!(req.caller_identity.is_none());
    }

    #[test]
    fn test_blank_statement_rejected() {
        let req = ClaimRequest::new("r1", "   ");
        assert!(matches!(req.validate(), Err(CoreError::InvalidRequest(_))));

        let req = ClaimRequest::new("r1", "The moon is made of rock");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_evidence_item_trims_and_rejects_blank() {
        let item = EvidenceItem::new("  http://x.org/a ", "\tEarth orbits the Sun\n").unwrap();
        assert_eq!(item.url, "http://x.org/a");
        assert_eq!(item.excerpt, "Earth orbits the Sun");

        assert!(EvidenceItem::new("", "x").is_none());
        assert!(EvidenceItem::new("http://x.org", "   ").is_none());
    }

    #[test]
    fn test_response_wire_shape() {
        let resp = ClaimResponse::with_evidence(
            "r9",
            vec![EvidenceItem::new("http://y.org", "y").unwrap()],
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["request_id"], "r9");
        assert_eq!(json["evidence"][0]["url"], "http://y.org");
        assert_eq!(json["evidence"][0]["excerpt"], "y");
    }
}
