//! Asset ledger server binary
//!
//! Usage: `asset-ledger-server [config.toml]`. Without a path the
//! configuration comes from `ASSET_LEDGER_*` environment variables.

use asset_ledger::{actor::spawn_exchange_actor, Config, Exchange};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting asset ledger server");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };
    let mailbox_capacity = config.actor.mailbox_capacity;

    let exchange = Exchange::open(config)?;
    let metrics = exchange.metrics().clone();
    tracing::info!(
        listings = exchange.marketplace().marketplace().len(),
        trades = exchange.marketplace().trades().len(),
        transactions = exchange.recorder().all_transactions().len(),
        "Ledger opened successfully"
    );

    let (handle, actor_task) = spawn_exchange_actor(exchange, mailbox_capacity);

    tokio::signal::ctrl_c().await?;

    tracing::info!(metrics = %metrics.render(), "Shutting down asset ledger server");
    handle.shutdown().await?;
    actor_task.await?;
    tracing::info!("Asset ledger server stopped");
    Ok(())
}
