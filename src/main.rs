use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use travel_gateway::build_router;
use travel_gateway::clock::{Clock, SystemClock};
use travel_gateway::config::{Args, Secrets};
use travel_gateway::metrics::RATE_LIMIT_KEYS;
use travel_gateway::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let secrets = Secrets::load();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(&args, secrets, clock).expect("Credentials misconfigured!");

    // background sweep - reclaims rate limit keys that went idle
    let sweep_state = state.clone();
    let sweep_every = Duration::from_secs(args.sweep_interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            sweep_state.limiter.sweep_expired();
            RATE_LIMIT_KEYS.set(sweep_state.limiter.tracked_keys() as f64);
        }
    });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("Gateway running on http://localhost:{}", args.port);
    info!(
        "Rate limiting {} (sweep every {}s)",
        if args.no_rate_limit { "disabled" } else { "enabled" },
        args.sweep_interval
    );
    axum::serve(listener, app).await.unwrap();
}
