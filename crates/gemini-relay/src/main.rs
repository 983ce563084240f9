use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gemini_relay::config::Config;
use gemini_relay::llm::{GeminiClient, UpstreamEndpoint, build_http_client};
use gemini_relay::server::{self, AppState};

const DEFAULT_LOG_FILTER: &str = "gemini_relay=info";

#[derive(Parser)]
#[command(name = "gemini-relay", version, about)]
struct Cli {
    /// Path to the YAML config file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "gemini-relay.yaml")]
    config: PathBuf,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port (takes precedence over PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Refuse to serve without a credential.
    let api_key = config.upstream.require_api_key()?;
    let endpoint = UpstreamEndpoint::resolve(&config.upstream, api_key)?;

    if config.upstream.danger_accept_invalid_certs {
        warn!("TLS certificate verification is disabled for upstream requests");
    }
    let http_client =
        build_http_client(&config.upstream).context("failed to build upstream HTTP client")?;

    info!(
        model = endpoint.model(),
        api_version = endpoint.api_version(),
        operation = %endpoint.operation(),
        url = %endpoint.url(),
        timeout_seconds = config.upstream.timeout_seconds,
        "Resolved upstream endpoint"
    );

    let state = AppState {
        provider: Arc::new(GeminiClient::new(http_client, endpoint)),
        expose_error_detail: config.server.expose_error_detail,
    };
    let app = server::build_app(state, &config.server);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Gemini relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Gemini relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
