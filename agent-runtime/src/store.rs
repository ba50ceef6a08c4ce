//! The agent registry: a single arena keyed by agent id with an owner index
//! maintained transactionally alongside every ownership mutation. All agent
//! state mutation goes through this type; the execution coordinator's commit
//! is the only path that touches execution bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use alloy::primitives::{Address, B256};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::naming::NameBinder;
use crate::oracle::PriceOracle;
use crate::types::{Agent, AgentId, Strategy, unix_now};

#[derive(Default)]
struct StoreInner {
    agents: HashMap<AgentId, Agent>,
    by_owner: HashMap<Address, Vec<AgentId>>,
}

pub struct AgentRegistry {
    inner: RwLock<StoreInner>,
    /// Per-agent commit locks, spanning re-validation through commit in the
    /// execution coordinator. Only same-agent executions serialize.
    commit_locks: DashMap<AgentId, Arc<Mutex<()>>>,
    oracle: Arc<dyn PriceOracle>,
    naming: Arc<dyn NameBinder>,
}

/// Structural strategy validation, shared by create and update.
fn validate_strategy(strategy: &Strategy) -> Result<(), AgentError> {
    if strategy.price_feed_id == B256::ZERO {
        return Err(AgentError::InvalidStrategy("zero price feed id".into()));
    }
    if strategy.trigger_price.is_zero() {
        return Err(AgentError::InvalidStrategy("zero trigger price".into()));
    }
    if strategy.token_in == Address::ZERO || strategy.token_out == Address::ZERO {
        return Err(AgentError::InvalidStrategy("zero token address".into()));
    }
    if strategy.token_in == strategy.token_out {
        return Err(AgentError::InvalidStrategy(
            "token_in and token_out must differ".into(),
        ));
    }
    Ok(())
}

impl AgentRegistry {
    pub fn new(oracle: Arc<dyn PriceOracle>, naming: Arc<dyn NameBinder>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            commit_locks: DashMap::new(),
            oracle,
            naming,
        }
    }

    /// Register a new agent and bind its subname. The id must be globally
    /// unique; the price feed must resolve at creation time so a dead feed
    /// cannot produce a permanently-unexecutable agent.
    pub async fn create(
        &self,
        id: AgentId,
        owner: Address,
        label: &str,
        mut strategy: Strategy,
    ) -> Result<B256, AgentError> {
        if owner == Address::ZERO {
            return Err(AgentError::InvalidAddress("zero owner".into()));
        }
        validate_strategy(&strategy)?;

        if self.inner.read().expect("registry lock").agents.contains_key(&id) {
            return Err(AgentError::AlreadyExists);
        }

        match self.oracle.resolve_feed(strategy.price_feed_id).await {
            Ok(true) => {}
            _ => return Err(AgentError::InvalidPriceFeed),
        }

        // Exactly-once, non-retryable side effect. If this succeeds and the
        // insert below loses a create race, the bind is simply orphaned.
        let ens_node = self.naming.bind_subname(label, owner).await?;

        // Execution bookkeeping is never caller-settable.
        strategy.last_executed = 0;

        let agent = Agent {
            owner,
            label: label.to_string(),
            ens_node,
            strategy,
            created_at: unix_now(),
            total_executions: 0,
        };

        let mut inner = self.inner.write().expect("registry lock");
        if inner.agents.contains_key(&id) {
            return Err(AgentError::AlreadyExists);
        }
        inner.agents.insert(id, agent);
        inner.by_owner.entry(owner).or_default().push(id);
        tracing::info!(agent_id = %id, %owner, label, "agent created");
        Ok(ens_node)
    }

    /// Replace the strategy wholesale. The stored `last_executed` is always
    /// preserved; callers cannot set it through an update. Use
    /// `reset_cooldown` for an explicit reset.
    pub async fn update_strategy(
        &self,
        id: AgentId,
        caller: Address,
        mut new_strategy: Strategy,
    ) -> Result<(), AgentError> {
        validate_strategy(&new_strategy)?;

        // Owner check before paying for the feed lookup.
        {
            let inner = self.inner.read().expect("registry lock");
            let agent = inner.agents.get(&id).ok_or(AgentError::NotFound)?;
            if agent.owner != caller {
                return Err(AgentError::Unauthorized);
            }
        }

        match self.oracle.resolve_feed(new_strategy.price_feed_id).await {
            Ok(true) => {}
            _ => return Err(AgentError::InvalidPriceFeed),
        }

        let mut inner = self.inner.write().expect("registry lock");
        let agent = inner.agents.get_mut(&id).ok_or(AgentError::NotFound)?;
        if agent.owner != caller {
            return Err(AgentError::Unauthorized);
        }
        new_strategy.last_executed = agent.strategy.last_executed;
        agent.strategy = new_strategy;
        tracing::info!(agent_id = %id, "strategy updated");
        Ok(())
    }

    /// Owner-only activation. Re-activating an active agent is a no-op success.
    pub fn activate(&self, id: AgentId, caller: Address) -> Result<(), AgentError> {
        self.set_active(id, caller, true)
    }

    /// Owner-only deactivation; the terminal soft delete. Idempotent.
    pub fn deactivate(&self, id: AgentId, caller: Address) -> Result<(), AgentError> {
        self.set_active(id, caller, false)
    }

    fn set_active(&self, id: AgentId, caller: Address, active: bool) -> Result<(), AgentError> {
        let mut inner = self.inner.write().expect("registry lock");
        let agent = inner.agents.get_mut(&id).ok_or(AgentError::NotFound)?;
        if agent.owner != caller {
            return Err(AgentError::Unauthorized);
        }
        if agent.strategy.is_active != active {
            agent.strategy.is_active = active;
            tracing::info!(agent_id = %id, active, "agent active flag changed");
        }
        Ok(())
    }

    /// Explicit cooldown reset, the only way to clear `last_executed`.
    pub fn reset_cooldown(&self, id: AgentId, caller: Address) -> Result<(), AgentError> {
        let mut inner = self.inner.write().expect("registry lock");
        let agent = inner.agents.get_mut(&id).ok_or(AgentError::NotFound)?;
        if agent.owner != caller {
            return Err(AgentError::Unauthorized);
        }
        agent.strategy.last_executed = 0;
        tracing::info!(agent_id = %id, "cooldown reset");
        Ok(())
    }

    /// Move the agent between owner-index entries atomically: it lives in
    /// exactly one owner's index before and after.
    pub fn transfer_ownership(
        &self,
        id: AgentId,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), AgentError> {
        if new_owner == Address::ZERO {
            return Err(AgentError::InvalidAddress("zero new owner".into()));
        }
        let mut inner = self.inner.write().expect("registry lock");
        let agent = inner.agents.get_mut(&id).ok_or(AgentError::NotFound)?;
        if agent.owner != caller {
            return Err(AgentError::Unauthorized);
        }
        if new_owner == caller {
            return Ok(());
        }
        agent.owner = new_owner;
        if let Some(ids) = inner.by_owner.get_mut(&caller) {
            ids.retain(|existing| *existing != id);
        }
        inner.by_owner.entry(new_owner).or_default().push(id);
        tracing::info!(agent_id = %id, from = %caller, to = %new_owner, "ownership transferred");
        Ok(())
    }

    pub fn get(&self, id: AgentId) -> Result<Agent, AgentError> {
        self.inner
            .read()
            .expect("registry lock")
            .agents
            .get(&id)
            .cloned()
            .ok_or(AgentError::NotFound)
    }

    /// Ids owned by `owner`; empty for an unknown owner, never an error.
    pub fn list_by_owner(&self, owner: Address) -> Vec<AgentId> {
        self.inner
            .read()
            .expect("registry lock")
            .by_owner
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Deterministic snapshot of the full agent population for scanning.
    pub fn ids_sorted(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .inner
            .read()
            .expect("registry lock")
            .agents
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock").agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit lock for one agent; held across re-validation, swap, and commit.
    pub fn commit_lock(&self, id: AgentId) -> Arc<Mutex<()>> {
        self.commit_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// The single commit write: advance `last_executed` and bump the
    /// execution counter. Called by the coordinator only after a successful
    /// swap; failures never reach this point.
    pub(crate) fn record_execution(&self, id: AgentId, now: u64) -> Result<(), AgentError> {
        let mut inner = self.inner.write().expect("registry lock");
        let agent = inner.agents.get_mut(&id).ok_or(AgentError::NotFound)?;
        agent.strategy.last_executed = now;
        agent.total_executions += 1;
        Ok(())
    }
}
