//! Registry document parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when parsing registry documents.
#[derive(Error, Debug)]
pub enum RegistryFormatError {
    #[error("Failed to read registry file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Registry validation failed: {0}")]
    ValidationError(String),
}

/// One registered peer as it appears in a registry document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerRecord {
    /// Peer identity (hotkey address)
    pub identity: String,

    /// Incentive currently assigned to the peer by the network
    #[serde(default)]
    pub incentive: f64,
}

/// Serialized form of the trusted peer registry.
///
/// A peer's uid is its position in `peers`.
///
/// ```yaml
/// block: 4120331
/// peers:
///   - identity: "5F3sa2TJAWMqDhXG6jhV4N8ko9SxwGy8TpaNS1repo5EYjQX"
///     incentive: 0.0125
///   - identity: "5HGjWAeFDfFCWPsjFQdVV2Msvz2XtMktvgocEZcCj68kUMaw"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryDocument {
    /// Network block height the document was taken at
    #[serde(default)]
    pub block: u64,

    /// Registered peers, indexed by uid
    #[serde(default)]
    pub peers: Vec<PeerRecord>,
}

impl RegistryDocument {
    /// Parse a registry from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryFormatError> {
        let document: RegistryDocument = serde_yaml::from_str(yaml)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse a registry from JSON.
    pub fn from_json(json: &str) -> Result<Self, RegistryFormatError> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse a registry file, picking the format from the extension.
    ///
    /// `.json` is parsed as JSON; anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryFormatError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_contents(path, &contents)
    }

    /// Parse contents already read from `path`, picking the format from its extension.
    pub fn from_contents(path: &Path, contents: &str) -> Result<Self, RegistryFormatError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(contents),
            _ => Self::from_yaml(contents),
        }
    }

    /// Check identities are non-blank and unique, incentives are finite,
    /// and every uid fits in a `u16`.
    ///
    /// The parsing constructors call this; documents built in code should too.
    pub fn validate(&self) -> Result<(), RegistryFormatError> {
        let mut seen = std::collections::HashSet::new();

        for (uid, peer) in self.peers.iter().enumerate() {
            if peer.identity.trim().is_empty() {
                return Err(RegistryFormatError::ValidationError(format!(
                    "Peer at uid {} has an empty identity",
                    uid
                )));
            }
            if !seen.insert(peer.identity.trim()) {
                return Err(RegistryFormatError::ValidationError(format!(
                    "Duplicate peer identity: {}",
                    peer.identity
                )));
            }
            if !peer.incentive.is_finite() {
                return Err(RegistryFormatError::ValidationError(format!(
                    "Peer {} has a non-finite incentive",
                    peer.identity
                )));
            }
        }

        if self.peers.len() > usize::from(u16::MAX) + 1 {
            return Err(RegistryFormatError::ValidationError(format!(
                "Too many peers: {}",
                self.peers.len()
            )));
        }

        Ok(())
    }
}
