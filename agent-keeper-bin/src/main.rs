use std::sync::Arc;

use agent_keeper_lib::seed::{load_seeds, seed_registry};
use agent_keeper_lib::{Keeper, KeeperConfig};
use agent_runtime::coordinator::ExecutionCoordinator;
use agent_runtime::dex::AggregatorClient;
use agent_runtime::ledger::Erc20Ledger;
use agent_runtime::naming::SubnameRegistrar;
use agent_runtime::oracle::HermesClient;
use agent_runtime::scanner::UpkeepScanner;
use agent_runtime::store::AgentRegistry;
use tokio::sync::watch;

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_log();

    let config = KeeperConfig::from_env()?;
    tracing::info!(?config, "keeper configuration loaded");

    let oracle = Arc::new(HermesClient::new(config.hermes_url.clone()));
    let dex = Arc::new(AggregatorClient::new(config.aggregator_url.clone()));
    let ledger = Arc::new(Erc20Ledger::new(&config.rpc_url)?);
    let naming = Arc::new(SubnameRegistrar::new(
        config.registrar_url.clone(),
        config.parent_name.clone(),
    ));

    let registry = Arc::new(AgentRegistry::new(oracle.clone(), naming));

    if let Some(path) = &config.agent_state_file {
        let seeds = load_seeds(path)?;
        let created = seed_registry(&registry, seeds).await;
        tracing::info!(created, total = registry.len(), "agent registry seeded");
    } else {
        tracing::warn!("no AGENT_STATE_FILE configured, starting with an empty registry");
    }

    let coordinator = Arc::new(ExecutionCoordinator::new(
        registry.clone(),
        oracle.clone(),
        dex,
        ledger.clone(),
        config.max_price_age_secs,
    ));
    let scanner = Arc::new(UpkeepScanner::new(registry.clone(), oracle.clone(), ledger));
    let keeper = Keeper::new(
        scanner,
        coordinator,
        registry,
        oracle.clone(),
        oracle,
        config.interval_secs,
        config.scan_budget,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received");
            let _ = shutdown_tx.send(true);
        }
    });

    keeper.run(shutdown_rx).await;
    Ok(())
}
