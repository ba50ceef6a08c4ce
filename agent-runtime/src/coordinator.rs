//! Execution coordinator: the single path by which an agent's swap fires.
//! Manual callers and the keeper share it; there is no fast path around the
//! re-validation, so the cooldown and atomicity guarantees cannot be
//! bypassed.
//!
//! Network-bound work (oracle update, price fetch, route quote) happens
//! before the per-agent commit lock is taken; the lock only spans
//! re-validation, balance resolution, the swap call, and the commit write,
//! so unrelated agents never queue behind slow feeds.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::dex::DexAggregator;
use crate::error::AgentError;
use crate::ledger::TokenLedger;
use crate::oracle::PriceOracle;
use crate::price;
use crate::store::AgentRegistry;
use crate::trigger::{self, CooldownDecision, TriggerDecision};
use crate::types::{Agent, AgentId, ExecutionRecord, PriceUpdate, unix_now};

pub struct ExecutionCoordinator {
    registry: Arc<AgentRegistry>,
    oracle: Arc<dyn PriceOracle>,
    dex: Arc<dyn DexAggregator>,
    ledger: Arc<dyn TokenLedger>,
    /// Maximum accepted observation age in seconds at commit time.
    max_price_age: u64,
}

impl ExecutionCoordinator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        oracle: Arc<dyn PriceOracle>,
        dex: Arc<dyn DexAggregator>,
        ledger: Arc<dyn TokenLedger>,
        max_price_age: u64,
    ) -> Self {
        Self {
            registry,
            oracle,
            dex,
            ledger,
            max_price_age,
        }
    }

    /// Attempt to execute one agent. On success the agent's bookkeeping is
    /// advanced exactly once and the execution record is returned (and
    /// logged); on any failure the agent is bit-for-bit unchanged.
    pub async fn execute(
        &self,
        agent_id: AgentId,
        update: Option<PriceUpdate>,
    ) -> Result<ExecutionRecord, AgentError> {
        // Validating: cheap local checks first.
        let agent = self.registry.get(agent_id)?;
        if !agent.strategy.is_active {
            return Err(AgentError::StrategyNotActive);
        }
        let feed = agent.strategy.price_feed_id;

        // PriceChecked: optionally advance the feed, then require freshness.
        if let Some(update) = &update {
            let required = self.oracle.get_update_fee(&update.payload).await?;
            if update.fee_provided < required {
                return Err(AgentError::InsufficientFee {
                    provided: update.fee_provided,
                    required,
                });
            }
            let refund = self.oracle.apply_update(&update.payload, update.fee_provided).await?;
            if !refund.is_zero() {
                tracing::debug!(agent_id = %agent_id, %refund, "excess update fee refunded");
            }
        }
        let observation = self
            .oracle
            .get_price_no_older_than(feed, self.max_price_age)
            .await?;
        let observed = price::normalize(observation.price, observation.expo)?;

        // Quote the route before taking the lock; the balance may still move
        // before commit, so the quoted size is provisional.
        let provisional = self.resolve_amount(&agent).await?;
        let quote = self
            .dex
            .quote(agent.strategy.token_in, agent.strategy.token_out, provisional)
            .await?;

        // Triggered through Committed: serialized per agent. A concurrent
        // attempt that lost this lock re-reads `last_executed` and fails the
        // eligibility check below.
        let lock = self.registry.commit_lock(agent_id);
        let _guard = lock.lock().await;

        let agent = self.registry.get(agent_id)?;
        if !agent.strategy.is_active {
            return Err(AgentError::StrategyNotActive);
        }
        if trigger::evaluate(&agent.strategy, observed) == TriggerDecision::NotMet {
            return Err(AgentError::TriggerNotMet {
                observed,
                threshold: agent.strategy.trigger_price,
            });
        }
        let now = unix_now();
        if let CooldownDecision::CoolingDown { remaining } = trigger::eligible(&agent.strategy, now)
        {
            return Err(AgentError::CooldownActive { remaining });
        }

        // Swapping: resolve the final amount inside the atomic unit.
        let swap_amount = self.resolve_amount(&agent).await?;
        let amount_out = self
            .dex
            .swap(
                agent.strategy.token_in,
                agent.strategy.token_out,
                swap_amount,
                agent.strategy.min_return_amount,
                &quote.routing_data,
            )
            .await?;

        // Committed: the single bookkeeping write.
        self.registry.record_execution(agent_id, now)?;

        let record = ExecutionRecord {
            agent_id,
            token_in: agent.strategy.token_in,
            token_out: agent.strategy.token_out,
            amount_in: swap_amount,
            amount_out,
            trigger_price: agent.strategy.trigger_price,
            observed_price: observed,
            timestamp: now,
        };
        tracing::info!(
            agent_id = %agent_id,
            token_in = %record.token_in,
            token_out = %record.token_out,
            amount_in = %record.amount_in,
            amount_out = %record.amount_out,
            observed_price = %observed,
            "agent executed"
        );
        Ok(record)
    }

    /// `amount_in` if nonzero, otherwise the full current token_in balance.
    /// Fails with `InsufficientBalance` for a zero or short balance.
    async fn resolve_amount(&self, agent: &Agent) -> Result<U256, AgentError> {
        let balance = self
            .ledger
            .balance_of(agent.owner, agent.strategy.token_in)
            .await?;
        let amount = if agent.strategy.amount_in.is_zero() {
            balance
        } else {
            agent.strategy.amount_in
        };
        if amount.is_zero() || balance < amount {
            return Err(AgentError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        Ok(amount)
    }
}
