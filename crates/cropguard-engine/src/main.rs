//! CropGuard Service Binary
//!
//! Runs the settlement engine against the in-memory ledger and the system
//! clock, logging every domain event until interrupted.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cropguard_common::{security::AuditLogger, InMemoryLedger, SystemClock, VERSION};
use cropguard_engine::{EngineConfig, SettlementEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting CropGuard settlement engine v{}", VERSION);

    // Load configuration
    let config = EngineConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let ledger = Arc::new(InMemoryLedger::new(config.pool_holder.clone()));
    let engine = SettlementEngine::new(
        config,
        ledger,
        Arc::new(SystemClock),
        Arc::new(AuditLogger::new()),
    )?;

    info!(
        "Trigger thresholds: drought<{}mm/30d, flood>{}mm/24h, heatwave>{}",
        engine.config().triggers.drought_rainfall_30d,
        engine.config().triggers.flood_rainfall_24h,
        engine.config().triggers.heatwave_temperature
    );

    let mut events = engine.subscribe();
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!(target: "cropguard::events", "{}", json),
                Err(e) => tracing::warn!("Failed to encode event {}: {}", event.name(), e),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    let stats = engine.registry().stats();
    info!(
        policies = stats.total,
        active = stats.active,
        claimed = stats.claimed,
        paid_out = %stats.total_paid_out,
        "Final registry state"
    );

    drop(engine);
    drain.abort();

    info!("CropGuard stopped");
    Ok(())
}
