//! Arcadia demo binary.
//!
//! Plays a scripted session between several in-process clients and prints
//! each client's final board.
//!
//! ```bash
//! ARCADIA_PLAYERS=3 RUST_LOG=runtime=debug cargo run -p arcadia-client
//! ```

use anyhow::{Result, bail};
use arcadia_client::{ClientConfig, logging, render, run_demo};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup_logging()?;

    let config = ClientConfig::from_env();
    tracing::info!(
        grid = %config.grid,
        players = config.players,
        duplicate_delivery = config.store.duplicate_delivery,
        "Starting Arcadia demo"
    );

    let report = run_demo(&config).await?;

    for (name, view) in &report.views {
        println!("== {name} ==");
        print!("{}", render::render(view));
        println!();
    }

    if let Some((_, view)) = report.views.first() {
        tracing::debug!(view = %serde_json::to_string(view)?, "Final view");
    }

    if !report.converged() {
        bail!("client views diverged");
    }
    tracing::info!("All clients converged");
    Ok(())
}
