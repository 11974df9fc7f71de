//! TokenGate -- token-gated read gateway for object storage.
//!
//! Startup is fail-fast: missing or invalid token-verification key
//! material aborts before the listener binds.  A gateway that cannot
//! verify tokens must not run and silently deny every request.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

/// Command-line arguments for the TokenGate server.
#[derive(Parser, Debug)]
#[command(
    name = "tokengate",
    version,
    about = "Token-gated read gateway for object storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "tokengate.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = tokengate::config::load_config(&cli.config)?;

    // Initialize tracing / logging.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Import token-verification key material. Fatal if absent or invalid.
    let public_key = config.auth.load_public_key()?;
    let verifier: Arc<dyn tokengate::token::TokenVerifier> = Arc::new(
        tokengate::token::EdDsaVerifier::new(&public_key, &config.auth.audience)?,
    );
    info!("Token verifier initialized (audience: {})", config.auth.audience);

    // Initialize Prometheus metrics recorder and register metric descriptions.
    if config.observability.metrics {
        tokengate::metrics::init_metrics();
        tokengate::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize the object store based on config.
    let store: Arc<dyn tokengate::storage::store::ObjectStore> =
        match config.storage.backend.as_str() {
            "memory" => {
                info!("In-memory object store initialized");
                Arc::new(tokengate::storage::memory::MemoryStore::new())
            }
            _ => {
                let root = &config.storage.local.root_dir;
                let local = tokengate::storage::local::LocalStore::new(root)?;
                info!("Local object store initialized at {}", root);
                Arc::new(local)
            }
        };

    // Build AppState.
    let state = Arc::new(tokengate::AppState {
        config: config.clone(),
        verifier,
        store,
    });

    let app = tokengate::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("TokenGate listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections
    // and wait for in-flight requests to complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("TokenGate shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
