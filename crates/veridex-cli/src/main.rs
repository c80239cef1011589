mod config;
mod server;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use veridex_runtime::{
    ClaimHandlerBuilder, FileRegistrySource, LlmProvider, ProviderRegistry, Responder,
    ServiceLoop, TrustedRegistry,
};

use config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    tracing::info!(
        netuid = cli.netuid,
        model = %cli.model,
        registry = %cli.registry.display(),
        "Starting veridex responder"
    );

    let provider = build_provider(&cli)?;
    let handler = ClaimHandlerBuilder::new()
        .provider(provider)
        .completion(cli.completion_config())
        .build()?;

    let registry = Arc::new(TrustedRegistry::default());
    let source = Arc::new(FileRegistrySource::new(&cli.registry));
    let mut service = ServiceLoop::new(cli.service_config(), Arc::clone(&registry), source)?;
    let status = service
        .initialize()
        .await
        .context("Initial registry load failed")?;
    tracing::info!(uid = ?status.uid, "{}", status);

    let service = service.spawn();
    let state = server::AppState::new(
        Responder::new(Arc::clone(&registry), handler),
        service.state_watch(),
    );
    let app = server::create_router(state);

    let addr = cli.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(netuid = cli.netuid, "Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await?;
    tracing::info!("Responder shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Create the configured backend.
///
/// Settings the backend reports as unusable are logged, not fatal: the
/// responder still starts, and requests answer with no evidence.
fn build_provider(cli: &Cli) -> Result<Arc<dyn LlmProvider>> {
    let providers = ProviderRegistry::with_defaults();
    if !providers.has_provider(&cli.provider) {
        bail!(
            "Unknown provider '{}'. Available: {}",
            cli.provider,
            providers.available_types().join(", ")
        );
    }

    let settings = cli.backend_settings();
    if let Err(e) = providers.validate(&cli.provider, &settings) {
        tracing::warn!(
            provider = %cli.provider,
            error = %e,
            "Backend not fully configured; responses will carry no evidence"
        );
    }
    let provider = providers.create(&cli.provider, &settings)?;
    tracing::info!(provider = provider.name(), "Backend configured");
    Ok(provider)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
