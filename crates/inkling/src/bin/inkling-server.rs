//! The `inkling-server` binary.

use inkling::{InklingError, InklingServer, ServerConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), InklingError> {
    let config = ServerConfig::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = InklingServer::builder().config(&config).build().await?;
    tracing::info!(
        addr = %config.bind_addr(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        grace_secs = config.reconnect_grace.as_secs(),
        "starting inkling server"
    );

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    }
}
