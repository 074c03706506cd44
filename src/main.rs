use analytics_relay::config::Config;
use analytics_relay::gateway::Gateway;
use analytics_relay::provider::ProviderHandle;
use analytics_relay::server::{self, AppState};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "analytics_relay=info,tower_http=info".into())
}

/// Plain-text logs in development, JSON in production.
fn init_tracing(production: bool) {
    if production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }
}

#[tokio::main]
async fn main() {
    // The log format depends on the loaded config; warnings raised while
    // loading it go to a temporary plain-text subscriber.
    let config_path = std::env::args().nth(1);
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        Config::load(config_path.as_deref().map(std::path::Path::new))
    });
    init_tracing(config.is_production());

    tracing::info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        "Starting analytics relay"
    );

    let provider = ProviderHandle::connect(&config).await;
    let gateway = Gateway::new(
        provider,
        Duration::from_secs(config.provider_timeout_secs),
    );
    let state = Arc::new(AppState::new(gateway, &config));

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    tracing::info!(addr = %addr, "Listening");
    let server =
        axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let drain_limit = Duration::from_secs(config.shutdown_timeout_secs);
    tokio::select! {
        result = server.into_future() => result.expect("Server error"),
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(drain_limit).await;
        } => tracing::warn!(secs = drain_limit.as_secs(), "Graceful shutdown timed out"),
    }
    tracing::info!("Stopped");
}
