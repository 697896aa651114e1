use clap::Parser;
use std::sync::Arc;
use supermockio::config::Args;
use supermockio::{AppState, Config, MockioServer};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("supermockio=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = Config::from_args(&args)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        ai_enabled = config.ai.enabled,
        "Starting SuperMockio"
    );

    let state = Arc::new(AppState::from_config(&config));
    let server = MockioServer::new(config.listen.socket_addr(), state);

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
