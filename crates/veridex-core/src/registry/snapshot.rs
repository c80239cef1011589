//! Immutable view of the trusted peer registry.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::document::RegistryDocument;
use crate::types::CallerIdentity;

/// A registered peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEntry {
    /// Position of the peer in the registry
    pub uid: u16,

    /// Incentive assigned by the network
    pub incentive: f64,
}

/// A complete, read-only registry snapshot.
///
/// Snapshots are never patched in place. A refresh builds a new one and the
/// holder swaps it in whole.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    block: u64,
    peers: BTreeMap<CallerIdentity, PeerEntry>,
    taken_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    /// A snapshot that trusts nobody.
    pub fn empty() -> Self {
        Self {
            block: 0,
            peers: BTreeMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Build a snapshot from a parsed registry document.
    ///
    /// Uids stop at `u16::MAX`; [`RegistryDocument::validate`] rejects longer
    /// documents.
    pub fn from_document(document: &RegistryDocument) -> Self {
        let peers = document
            .peers
            .iter()
            .zip(0..=u16::MAX)
            .map(|(record, uid)| {
                (
                    CallerIdentity::new(record.identity.trim()),
                    PeerEntry {
                        uid,
                        incentive: record.incentive,
                    },
                )
            })
            .collect();

        Self {
            block: document.block,
            peers,
            taken_at: Utc::now(),
        }
    }

    /// Build a snapshot directly from identities, with zero incentives.
    /// Identities past uid `u16::MAX` are dropped.
    pub fn from_identities<I, S>(block: u64, identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers = identities
            .into_iter()
            .zip(0..=u16::MAX)
            .map(|(id, uid)| {
                (
                    CallerIdentity::new(id),
                    PeerEntry {
                        uid,
                        incentive: 0.0,
                    },
                )
            })
            .collect();

        Self {
            block,
            peers,
            taken_at: Utc::now(),
        }
    }

    /// Whether the identity is registered.
    pub fn contains(&self, identity: &CallerIdentity) -> bool {
        self.peers.contains_key(identity)
    }

    /// Look up a registered peer.
    pub fn peer(&self, identity: &CallerIdentity) -> Option<&PeerEntry> {
        self.peers.get(identity)
    }

    /// Block height the snapshot was taken at.
    pub fn block(&self) -> u64 {
        self.block
    }

    /// When this snapshot was built.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer is registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::document::PeerRecord;

    #[test]
    fn test_uid_follows_document_order() {
        let doc = RegistryDocument {
            block: 10,
            peers: vec![
                PeerRecord {
                    identity: "hk-a".to_string(),
                    incentive: 0.1,
                },
                PeerRecord {
                    identity: "hk-b".to_string(),
                    incentive: 0.7,
                },
            ],
        };
        let snapshot = RegistrySnapshot::from_document(&doc);

        assert_eq!(snapshot.block(), 10);
        assert_eq!(snapshot.len(), 2);
        let b = snapshot.peer(&CallerIdentity::new("hk-b")).unwrap();
        assert_eq!(b.uid, 1);
        assert_eq!(b.incentive, 0.7);
    }

    #[test]
    fn test_empty_snapshot_trusts_nobody() {
        let snapshot = RegistrySnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(!snapshot.contains(&CallerIdentity::new("hk-a")));
    }

    #[test]
    fn test_from_identities() {
        let snapshot = RegistrySnapshot::from_identities(5, ["hk-a", "hk-b"]);
        assert!(snapshot.contains(&CallerIdentity::new("hk-a")));
        assert_eq!(snapshot.peer(&CallerIdentity::new("hk-b")).unwrap().uid, 1);
    }

    #[test]
    fn test_uids_never_wrap() {
        let ids = (0..=usize::from(u16::MAX) + 1).map(|i| format!("hk-{}", i));
        let snapshot = RegistrySnapshot::from_identities(1, ids);

        assert_eq!(snapshot.len(), usize::from(u16::MAX) + 1);
        assert_eq!(snapshot.peer(&CallerIdentity::new("hk-0")).unwrap().uid, 0);
        assert_eq!(
            snapshot.peer(&CallerIdentity::new("hk-65535")).unwrap().uid,
            u16::MAX
        );
        assert!(!snapshot.contains(&CallerIdentity::new("hk-65536")));
    }
}
