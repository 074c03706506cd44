//! Terminal watcher: mounts a live view against a running relay and logs
//! each merged update until interrupted.

use analytics_relay::client::DashboardClient;
use analytics_relay::live::{ConnectionState, LiveView};
use analytics_relay::query::window::RangeToken;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Follow a relay's dashboard data from the terminal.
#[derive(Parser, Debug)]
#[command(name = "relay-watch", version, about)]
struct Cli {
    /// Relay API base URL
    #[arg(short = 'u', long, default_value = "http://localhost:3001/api", env = "RELAY_API_URL")]
    url: String,

    /// Range token: 1d, 7d, 30d or 90d (anything else means 7d)
    #[arg(short = 'r', long, default_value = "7d")]
    range: String,

    /// Realtime refresh period in seconds
    #[arg(short = 'p', long, default_value_t = 30)]
    period: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

fn log_state(state: &ConnectionState) {
    let visitors = state
        .key_metrics
        .as_ref()
        .map_or("-", |m| m.total_visitors.as_str());
    let active: u64 = state.realtime.iter().map(|p| p.active_visitors).sum();
    tracing::info!(
        loading = state.loading,
        live = state.is_live,
        provider_connected = state.is_provider_connected,
        visitors,
        active_now = active,
        top_page = state.page_views.first().map_or("-", |p| p.label.as_str()),
        error = state.error.as_deref().unwrap_or(""),
        "Dashboard update"
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_watch=info,analytics_relay=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let range = RangeToken::parse_or_default(Some(&cli.range));
    let client = DashboardClient::new(cli.url.clone(), Duration::from_secs(cli.timeout))
        .unwrap_or_else(|e| panic!("Failed to create client: {e}"));

    tracing::info!(url = %cli.url, range = %range, "Mounting live view");
    let view = LiveView::mount(Arc::new(client), range, Duration::from_secs(cli.period)).await;
    let mut updates = view.subscribe();
    log_state(&view.snapshot());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                log_state(&state);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    view.unmount();
}
