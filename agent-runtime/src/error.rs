use alloy::primitives::U256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent not found")]
    NotFound,

    #[error("Agent id already exists")]
    AlreadyExists,

    #[error("Caller is not the agent owner")]
    Unauthorized,

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Price feed cannot be resolved")]
    InvalidPriceFeed,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Strategy is not active")]
    StrategyNotActive,

    #[error("Non-positive oracle price: {0}")]
    InvalidPrice(i64),

    #[error("Stale price: published {published}, now {now}, max age {max_age}s")]
    StalePrice {
        published: u64,
        now: u64,
        max_age: u64,
    },

    #[error("Price update not applied: {0}")]
    PriceNotUpdated(String),

    #[error("Insufficient update fee: provided {provided}, required {required}")]
    InsufficientFee { provided: U256, required: U256 },

    #[error("Trigger not met: observed {observed}, threshold {threshold}")]
    TriggerNotMet { observed: U256, threshold: U256 },

    #[error("Cooldown active: {remaining}s remaining")]
    CooldownActive { remaining: u64 },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("Swap failed: {0}")]
    SwapFailed(String),

    #[error("Naming error: {0}")]
    NamingError(String),

    #[error("Oracle error: {0}")]
    OracleError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl AgentError {
    /// Expected, non-fatal outcomes of a scan-then-execute cycle. These are
    /// retried naturally on the next keeper cycle and never logged as alarms.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::CooldownActive { .. }
                | AgentError::TriggerNotMet { .. }
                | AgentError::StalePrice { .. }
                | AgentError::PriceNotUpdated(_)
                | AgentError::InsufficientBalance { .. }
        )
    }

    /// External-capability failures (oracle, aggregator, chain, registrar).
    /// Retried next cycle and counted in per-cycle statistics.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AgentError::SwapFailed(_)
                | AgentError::OracleError(_)
                | AgentError::NamingError(_)
                | AgentError::HttpError(_)
                | AgentError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AgentError::Timeout(e.to_string())
        } else {
            AgentError::HttpError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError(e.to_string())
    }
}
