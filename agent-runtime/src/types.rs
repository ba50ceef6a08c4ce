use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Opaque 32-byte price feed identifier (e.g. a Pyth feed id).
pub type FeedId = B256;

/// Caller-chosen 32-byte agent identifier, globally unique at creation time.
pub type AgentId = B256;

/// Trigger strategy owned by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub price_feed_id: FeedId,
    /// Threshold at the feed's native scale. Must be nonzero.
    pub trigger_price: U256,
    /// `true`: fire when price >= trigger_price. `false`: fire when price <= trigger_price.
    pub trigger_above: bool,
    pub token_in: Address,
    pub token_out: Address,
    /// Zero means "swap the full token_in balance at execution time".
    pub amount_in: U256,
    /// Slippage floor for the swap. Zero is allowed.
    pub min_return_amount: U256,
    pub is_active: bool,
    /// Unix timestamp of the most recent successful execution (0 = never).
    /// Written only by the execution coordinator's commit step.
    #[serde(default)]
    pub last_executed: u64,
    /// Minimum seconds between two successful executions.
    pub cooldown_period: u64,
}

/// A registered agent. Agents are never deleted; deactivating the strategy
/// is the terminal soft delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub owner: Address,
    /// Human-readable label the subname was minted under at creation.
    pub label: String,
    /// ENS node bound at creation.
    pub ens_node: B256,
    pub strategy: Strategy,
    pub created_at: u64,
    /// Incremented exactly once per successful execution, never on failure.
    pub total_executions: u64,
}

/// A signed, timestamped observation from the price oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Price mantissa. Non-positive values are rejected at normalization.
    pub price: i64,
    /// Decimal exponent; negative for fractional feeds (the common case).
    pub expo: i32,
    /// Unix timestamp the observation was published at.
    pub publish_time: u64,
}

/// Opaque oracle update payload plus the fee the caller is willing to pay.
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    pub payload: Vec<u8>,
    pub fee_provided: U256,
}

/// Routing data and expected return for a swap, as quoted by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub expected_out: U256,
    /// Aggregator-specific routing blob, passed back verbatim on swap.
    pub routing_data: serde_json::Value,
}

/// Emitted exactly once per successful execution. The only authoritative
/// record consumers may rely on for "did this trigger fire".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub agent_id: AgentId,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub trigger_price: U256,
    pub observed_price: U256,
    pub timestamp: u64,
}

/// Current unix timestamp in seconds.
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
