//! Command-line and environment configuration.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use veridex_core::CallerIdentity;
use veridex_runtime::providers::DEFAULT_MODEL;
use veridex_runtime::service::DEFAULT_REFRESH_EVERY;
use veridex_runtime::{BackendSettings, CompletionConfig, ServiceConfig};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "veridex-responder",
    version,
    about = "Answers claim evidence requests from registered peers"
)]
pub struct Cli {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "VERIDEX_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value = "8091", env = "VERIDEX_PORT")]
    pub port: u16,

    /// Subnet the responder serves
    #[arg(long, default_value_t = 1, env = "VERIDEX_NETUID")]
    pub netuid: u16,

    /// Our own peer identity; startup fails if it is not registered
    #[arg(long, env = "VERIDEX_IDENTITY")]
    pub identity: Option<String>,

    /// Registry document (YAML, or JSON by extension)
    #[arg(long, env = "VERIDEX_REGISTRY")]
    pub registry: PathBuf,

    /// Model backend type
    #[arg(long, default_value = "openai", env = "VERIDEX_PROVIDER")]
    pub provider: String,

    /// Model identifier
    #[arg(long, default_value = DEFAULT_MODEL, env = "VERIDEX_MODEL")]
    pub model: String,

    /// Backend base URL
    #[arg(long, env = "VERIDEX_BASE_URL")]
    pub base_url: Option<String>,

    /// Backend API key (falls back to OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Backend request timeout
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration, env = "VERIDEX_TIMEOUT")]
    pub timeout: Duration,

    /// Service loop tick interval
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration, env = "VERIDEX_TICK")]
    pub tick: Duration,

    /// Refresh the registry every N ticks
    #[arg(long, default_value_t = DEFAULT_REFRESH_EVERY, env = "VERIDEX_REFRESH_EVERY")]
    pub refresh_every: u64,

    /// Emit logs as JSON
    #[arg(long, env = "VERIDEX_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn own_identity(&self) -> Option<CallerIdentity> {
        self.identity
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(CallerIdentity::new)
    }

    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig::new(&self.model).with_timeout(self.timeout)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            tick: self.tick,
            refresh_every: self.refresh_every,
            own_identity: self.own_identity(),
        }
    }

    pub fn backend_settings(&self) -> BackendSettings {
        let mut settings = BackendSettings::new();
        if let Some(key) = &self.api_key {
            settings = settings.with_api_key(key);
        }
        if let Some(url) = &self.base_url {
            settings = settings.with_base_url(url);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["veridex-responder", "--registry", "peers.yaml"]).unwrap();
        assert_eq!(cli.port, 8091);
        assert_eq!(cli.netuid, 1);
        assert_eq!(cli.model, "gpt-4o");
        assert_eq!(cli.tick, Duration::from_secs(1));
        assert_eq!(cli.timeout, Duration::from_secs(30));
        assert_eq!(cli.refresh_every, 60);
        assert!(cli.own_identity().is_none());

        let completion = cli.completion_config();
        assert_eq!(completion.model, "gpt-4o");
        assert_eq!(completion.temperature, 0.2);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "veridex-responder",
            "--registry",
            "peers.json",
            "--identity",
            " hk-self ",
            "--tick",
            "250ms",
            "--refresh-every",
            "4",
            "--model",
            "gpt-4o-mini",
            "--base-url",
            "http://localhost:9000/v1",
            "--api-key",
            "sk-test",
        ])
        .unwrap();

        let service = cli.service_config();
        assert_eq!(service.tick, Duration::from_millis(250));
        assert_eq!(service.refresh_every, 4);
        assert_eq!(service.own_identity, Some(CallerIdentity::new("hk-self")));

        assert_eq!(cli.completion_config().model, "gpt-4o-mini");
        let backend = cli.backend_settings();
        assert_eq!(backend.api_key(), Some("sk-test"));
        assert_eq!(backend.base_url.as_deref(), Some("http://localhost:9000/v1"));
    }

    #[test]
    fn test_bad_tick_rejected() {
        let result = Cli::try_parse_from([
            "veridex-responder",
            "--registry",
            "peers.yaml",
            "--tick",
            "eventually",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_required() {
        assert!(Cli::try_parse_from(["veridex-responder"]).is_err());
    }
}
