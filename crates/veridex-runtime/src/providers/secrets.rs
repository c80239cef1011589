//! Backend credentials.
//!
//! A key is wrapped in [`ApiCredential`] the moment it is read. From then on
//! it prints as `[REDACTED]` and is only reachable through
//! [`ApiCredential::expose`], which the HTTP client calls when it sets the
//! `Authorization` header.
//!
//! ```ignore
//! let cred = ApiCredential::resolve(settings.api_key(), "OPENAI_API_KEY", "OpenAI API key");
//! if !cred.is_available() {
//!     tracing::warn!("{} missing, serving without a backend", cred.name());
//! }
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Value shipped in sample `.env` files; never a real key.
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `--api-key` or other explicit configuration
    Config,
    Environment,
    /// Handed in by calling code
    Programmatic,
    /// Nothing usable found
    Missing,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
            CredentialSource::Missing => "missing",
        })
    }
}

/// A backend API key that never prints.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Stand-in for a key that was never configured.
    ///
    /// Calls made with it fail before reaching the network.
    pub fn missing(name: &'static str) -> Self {
        Self::new(String::new(), CredentialSource::Missing, name)
    }

    /// Read a key from `env_var`, failing if it is unset or a placeholder.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        match std::env::var(env_var) {
            Ok(v) if is_real_key(&v) => Ok(Self::new(v, CredentialSource::Environment, name)),
            _ => Err(ProviderError::NotConfigured(format!(
                "{} not set: configure the {} environment variable",
                name, env_var
            ))),
        }
    }

    /// Use `explicit` if it is a real key, else `env_var`, else a missing credential.
    pub fn resolve(explicit: Option<&str>, env_var: &str, name: &'static str) -> Self {
        if let Some(value) = explicit.filter(|v| is_real_key(v)) {
            return Self::new(value.trim(), CredentialSource::Config, name);
        }
        match std::env::var(env_var) {
            Ok(value) if is_real_key(&value) => {
                Self::new(value.trim(), CredentialSource::Environment, name)
            }
            _ => Self::missing(name),
        }
    }

    /// Whether a real key was found.
    pub fn is_available(&self) -> bool {
        self.source != CredentialSource::Missing && !self.is_empty()
    }

    /// The raw key. Only for building the outgoing request.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn is_real_key(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with(PLACEHOLDER_KEY)
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [REDACTED]", self.name, self.source)
    }
}
