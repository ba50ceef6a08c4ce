//! Upkeep scanner: a bounded-work pass over the agent population producing
//! candidates for the execution coordinator. The scan is optimistic; it may
//! use an observation the coordinator would reject as stale, because every
//! staleness and eligibility check is re-run under the commit lock.

use std::sync::Arc;

use crate::ledger::TokenLedger;
use crate::oracle::PriceOracle;
use crate::price;
use crate::store::AgentRegistry;
use crate::trigger::{self, CooldownDecision, TriggerDecision};
use crate::types::AgentId;

pub struct UpkeepScanner {
    registry: Arc<AgentRegistry>,
    oracle: Arc<dyn PriceOracle>,
    ledger: Arc<dyn TokenLedger>,
}

impl UpkeepScanner {
    pub fn new(
        registry: Arc<AgentRegistry>,
        oracle: Arc<dyn PriceOracle>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Self {
        Self {
            registry,
            oracle,
            ledger,
        }
    }

    /// Examine at most `budget` agents (in deterministic id order) and
    /// return those whose trigger is met and that look executable. A bad
    /// feed or ledger error skips the one agent; a scan never aborts.
    pub async fn scan(&self, now: u64, budget: usize) -> Vec<AgentId> {
        let mut candidates = Vec::new();
        for id in self.registry.ids_sorted().into_iter().take(budget) {
            if self.is_candidate(id, now).await {
                candidates.push(id);
            }
        }
        candidates
    }

    async fn is_candidate(&self, id: AgentId, now: u64) -> bool {
        let Ok(agent) = self.registry.get(id) else {
            return false;
        };
        let strategy = &agent.strategy;
        if !strategy.is_active {
            return false;
        }
        if matches!(
            trigger::eligible(strategy, now),
            CooldownDecision::CoolingDown { .. }
        ) {
            return false;
        }

        let Ok(balance) = self.ledger.balance_of(agent.owner, strategy.token_in).await else {
            tracing::debug!(agent_id = %id, "scan skip: balance unavailable");
            return false;
        };
        let need = if strategy.amount_in.is_zero() {
            balance
        } else {
            strategy.amount_in
        };
        if need.is_zero() || balance < need {
            return false;
        }

        // Best available observation, staleness tolerated here.
        let Ok(observation) = self.oracle.get_price(strategy.price_feed_id).await else {
            tracing::debug!(agent_id = %id, "scan skip: feed unavailable");
            return false;
        };
        let Ok(observed) = price::normalize(observation.price, observation.expo) else {
            return false;
        };
        trigger::evaluate(strategy, observed) == TriggerDecision::Met
    }
}
