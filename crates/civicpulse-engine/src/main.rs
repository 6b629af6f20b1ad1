//! Engine binary for CivicPulse.
//!
//! Wires the synthetic generator and the index calculator to a store and
//! runs both on fixed intervals until Ctrl-C. The scenario, correlation
//! and dashboard components are libraries driven by callers; this binary
//! only keeps fresh events and metric snapshots flowing.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `civicpulse-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing), `RUST_LOG` over the config level
//! 3. Build the zone registry and the event generator
//! 4. Open the configured store (in-memory, or `PostgreSQL` plus migrations)
//! 5. Spawn the ingestion and index computation loops
//! 6. Wait for Ctrl-C, then stop the loops

mod error;
mod scheduler;

use std::path::Path;

use civicpulse_core::config::{CivicConfig, StorageBackend};
use civicpulse_core::generator::EventGenerator;
use civicpulse_core::memory_store::MemoryStore;
use civicpulse_core::store::CityStore;
use civicpulse_core::zones::ZoneRegistry;
use civicpulse_db::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scheduler::Jobs;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "civicpulse-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the signal handler
/// cannot be set up.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        storage_backend = ?config.infrastructure.storage_backend,
        ingest_interval_secs = config.scheduler.ingest_interval_secs,
        process_interval_secs = config.scheduler.process_interval_secs,
        "civicpulse-engine starting"
    );

    // 3. Zone registry and generator.
    let registry = ZoneRegistry::from_override(config.zones.clone());
    info!(zones = registry.len(), "Zone registry loaded");
    let generator = match config.generator.seed {
        Some(seed) => {
            info!(seed, "Seeding generator from config");
            EventGenerator::seeded(registry, seed)
        }
        None => EventGenerator::from_entropy(registry),
    };

    // 4. Store selection.
    match config.infrastructure.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            run(MemoryStore::new(), generator, &config).await
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.infrastructure).await?;
            let result = run(store.clone(), generator, &config).await;
            store.close().await;
            result
        }
    }
}

/// Run the scheduler against `store` until Ctrl-C.
async fn run<S>(store: S, generator: EventGenerator, config: &CivicConfig) -> Result<(), EngineError>
where
    S: CityStore + Clone + 'static,
{
    // 5. Spawn the job loops.
    let jobs = Jobs::spawn(store, generator, &config.scheduler);

    // 6. Wait for shutdown.
    let signal = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
    jobs.shutdown().await;
    signal?;

    info!("civicpulse-engine shutdown complete");
    Ok(())
}

/// Load the configuration from [`CONFIG_PATH`], or defaults when the file
/// does not exist.
fn load_config() -> Result<CivicConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(CivicConfig::from_file(config_path)?)
    } else {
        Ok(CivicConfig::from_env())
    }
}
