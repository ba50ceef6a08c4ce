//! Keeper configuration from environment variables, with defaults suitable
//! for a local stack.

use std::path::PathBuf;

use agent_runtime::AgentError;

#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Seconds between keeper cycles. Must be shorter than the smallest
    /// expected cooldown or windows get missed.
    pub interval_secs: u64,
    /// Maximum agents examined per upkeep scan.
    pub scan_budget: usize,
    /// Maximum accepted observation age at commit time, in seconds.
    pub max_price_age_secs: u64,
    pub hermes_url: String,
    pub aggregator_url: String,
    pub rpc_url: String,
    pub registrar_url: String,
    /// Parent ENS name agent subnames are minted under.
    pub parent_name: String,
    /// Optional JSON file of agent definitions loaded at startup.
    pub agent_state_file: Option<PathBuf>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AgentError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AgentError::ConfigError(format!("unparseable {key}={raw}"))),
        Err(_) => Ok(default),
    }
}

impl KeeperConfig {
    pub fn from_env() -> Result<Self, AgentError> {
        Ok(Self {
            interval_secs: env_or("KEEPER_INTERVAL_SECS", 30)?,
            scan_budget: env_or("SCAN_BUDGET", 100)?,
            max_price_age_secs: env_or("MAX_PRICE_AGE_SECS", 300)?,
            hermes_url: env_or("HERMES_URL", "https://hermes.pyth.network".to_string())?,
            aggregator_url: env_or("AGGREGATOR_URL", "http://localhost:8081".to_string())?,
            rpc_url: env_or("RPC_URL", "http://localhost:8545".to_string())?,
            registrar_url: env_or("REGISTRAR_URL", "http://localhost:8082".to_string())?,
            parent_name: env_or("PARENT_ENS_NAME", "agents.eth".to_string())?,
            agent_state_file: std::env::var("AGENT_STATE_FILE").ok().map(PathBuf::from),
        })
    }
}
