use anyhow::Context;
use rust_common::{TracingConfig, init_tracing};
use session_service::{Config, server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&TracingConfig::from_env("session-service")).context("initializing tracing")?;

    let config = Config::from_env().context("loading configuration")?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting session service");

    server::run(config).await
}
