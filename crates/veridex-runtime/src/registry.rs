//! Shared trusted-registry holder and its refresh sources.
//!
//! Many request tasks read the registry while one periodic writer replaces
//! it. Readers clone an `Arc` to a complete [`RegistrySnapshot`]; the writer
//! swaps the `Arc` under a short write lock. A reader therefore sees either
//! the old snapshot or the new one, never a mix.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use veridex_core::{
    authorize, AuthDecision, CallerIdentity, RegistryDocument, RegistryFormatError,
    RegistrySnapshot,
};

/// Errors from registry refresh.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid registry document: {0}")]
    Format(#[from] RegistryFormatError),

    #[error("Registry source unavailable: {0}")]
    Unavailable(String),
}

/// Where fresh registry snapshots come from.
///
/// The peer network itself is outside this crate; a source is the narrow
/// seam through which its membership list arrives.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch a complete, current snapshot.
    async fn fetch(&self) -> Result<RegistrySnapshot, RegistryError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads the registry from a YAML or JSON file on every refresh.
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    /// Create a source for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    async fn fetch(&self) -> Result<RegistrySnapshot, RegistryError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RegistryError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let document = RegistryDocument::from_contents(&self.path, &contents)?;
        Ok(RegistrySnapshot::from_document(&document))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Serves a registry document held in memory.
///
/// The document can be replaced at any time; the next fetch picks it up.
#[derive(Debug, Default)]
pub struct StaticRegistrySource {
    document: RwLock<RegistryDocument>,
}

impl StaticRegistrySource {
    /// Create a source serving `document`, which must validate.
    pub fn new(document: RegistryDocument) -> Result<Self, RegistryError> {
        document.validate()?;
        Ok(Self {
            document: RwLock::new(document),
        })
    }

    /// Replace the served document. An invalid one leaves the current
    /// document in place.
    pub fn set(&self, document: RegistryDocument) -> Result<(), RegistryError> {
        document.validate()?;
        *self.document.write() = document;
        Ok(())
    }
}

#[async_trait]
impl RegistrySource for StaticRegistrySource {
    async fn fetch(&self) -> Result<RegistrySnapshot, RegistryError> {
        Ok(RegistrySnapshot::from_document(&self.document.read()))
    }

    fn describe(&self) -> String {
        "static document".to_string()
    }
}

/// The current trusted registry, shared by reference.
#[derive(Debug)]
pub struct TrustedRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl TrustedRegistry {
    /// Create a registry holding `snapshot`.
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Take a handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&*self.current.read())
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: RegistrySnapshot) -> Arc<RegistrySnapshot> {
        let next = Arc::new(snapshot);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Check a caller against the current snapshot.
    pub fn authorize(&self, identity: &CallerIdentity) -> AuthDecision {
        authorize(identity, &self.snapshot())
    }

    /// Fetch from `source` and swap the result in.
    ///
    /// On failure the current snapshot stays in place.
    pub async fn refresh_from(
        &self,
        source: &dyn RegistrySource,
    ) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let fresh = source.fetch().await?;
        tracing::debug!(
            source = %source.describe(),
            block = fresh.block(),
            peers = fresh.len(),
            "Registry refreshed"
        );
        self.replace(fresh);
        Ok(self.snapshot())
    }
}

impl Default for TrustedRegistry {
    fn default() -> Self {
        Self::new(RegistrySnapshot::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veridex_core::PeerRecord;

    fn document(block: u64, ids: &[&str]) -> RegistryDocument {
        RegistryDocument {
            block,
            peers: ids
                .iter()
                .map(|id| PeerRecord {
                    identity: id.to_string(),
                    incentive: 0.0,
                })
                .collect(),
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RegistrySource for FailingSource {
        async fn fetch(&self) -> Result<RegistrySnapshot, RegistryError> {
            Err(RegistryError::Unavailable("network down".to_string()))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn test_default_registry_blocks_everyone() {
        let registry = TrustedRegistry::default();
        assert!(registry.authorize(&CallerIdentity::new("hk-a")).blocked);
    }

    #[test]
    fn test_old_handle_survives_replace() {
        let registry = TrustedRegistry::new(RegistrySnapshot::from_identities(1, ["hk-a"]));
        let held = registry.snapshot();

        let previous = registry.replace(RegistrySnapshot::from_identities(2, ["hk-b"]));

        assert_eq!(previous.block(), 1);
        assert!(held.contains(&CallerIdentity::new("hk-a")));
        assert!(!registry.snapshot().contains(&CallerIdentity::new("hk-a")));
        assert!(registry.snapshot().contains(&CallerIdentity::new("hk-b")));
    }

    #[tokio::test]
    async fn test_refresh_from_static_source() {
        let registry = TrustedRegistry::default();
        let source = StaticRegistrySource::new(document(7, &["hk-a"])).unwrap();

        let snapshot = registry.refresh_from(&source).await.unwrap();
        assert_eq!(snapshot.block(), 7);
        assert!(!registry.authorize(&CallerIdentity::new("hk-a")).blocked);

        source.set(document(8, &["hk-b"])).unwrap();
        registry.refresh_from(&source).await.unwrap();
        assert!(registry.authorize(&CallerIdentity::new("hk-a")).blocked);
        assert!(!registry.authorize(&CallerIdentity::new("hk-b")).blocked);
    }

    #[tokio::test]
    async fn test_static_source_rejects_invalid_documents() {
        let duplicated = document(1, &["hk-a", "hk-a"]);
        assert!(matches!(
            StaticRegistrySource::new(duplicated.clone()),
            Err(RegistryError::Format(_))
        ));

        let source = StaticRegistrySource::new(document(2, &["hk-a"])).unwrap();
        assert!(source.set(duplicated).is_err());
        assert!(source.set(document(3, &["hk-b", " "])).is_err());

        let snapshot = source.fetch().await.unwrap();
        assert_eq!(snapshot.block(), 2);
        assert!(snapshot.contains(&CallerIdentity::new("hk-a")));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let registry = TrustedRegistry::new(RegistrySnapshot::from_identities(3, ["hk-a"]));

        let result = registry.refresh_from(&FailingSource).await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
        assert_eq!(registry.snapshot().block(), 3);
        assert!(!registry.authorize(&CallerIdentity::new("hk-a")).blocked);
    }

    #[tokio::test]
    async fn test_file_source_reads_yaml() {
        let path = std::env::temp_dir().join(format!(
            "veridex-registry-{}-{}.yaml",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, "block: 42\npeers:\n  - identity: hk-file\n    incentive: 0.5\n")
            .unwrap();

        let source = FileRegistrySource::new(&path);
        let snapshot = source.fetch().await.unwrap();
        assert_eq!(snapshot.block(), 42);
        assert_eq!(
            snapshot.peer(&CallerIdentity::new("hk-file")).unwrap().incentive,
            0.5
        );

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileRegistrySource::new("/nonexistent/veridex/registry.yaml");
        assert!(matches!(
            source.fetch().await,
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_snapshots() {
        let registry = Arc::new(TrustedRegistry::new(RegistrySnapshot::from_identities(
            0,
            ["hk-a", "hk-b"],
        )));

        let writer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for block in 1..200u64 {
                    let ids = if block % 2 == 0 {
                        vec!["hk-a", "hk-b"]
                    } else {
                        vec!["hk-c", "hk-d"]
                    };
                    registry.replace(RegistrySnapshot::from_identities(block, ids));
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let snap = registry.snapshot();
                        let a = snap.contains(&CallerIdentity::new("hk-a"));
                        let b = snap.contains(&CallerIdentity::new("hk-b"));
                        assert_eq!(a, b, "observed a partial snapshot");
                        assert_eq!(snap.len(), 2);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in futures::future::join_all(readers).await {
            reader.unwrap();
        }
    }
}
