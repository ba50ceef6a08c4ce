//! The keeper loop: scan for candidates, fetch external data per candidate,
//! and drive the execution coordinator. One candidate's failure never aborts
//! the rest of the cycle, and no failure is fatal to the loop.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use agent_runtime::coordinator::ExecutionCoordinator;
use agent_runtime::oracle::{PriceOracle, UpdateSource};
use agent_runtime::scanner::UpkeepScanner;
use agent_runtime::store::AgentRegistry;
use agent_runtime::{AgentId, PriceUpdate, unix_now};

/// Per-cycle accounting, logged at the end of every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Candidates produced by the upkeep scan.
    pub scanned: usize,
    pub executed: usize,
    /// Transient-condition outcomes (cooldown, trigger, staleness, balance).
    pub skipped: usize,
    /// External-capability and unexpected failures, retried next cycle.
    pub failed: usize,
}

enum CandidateOutcome {
    Executed,
    Skipped,
    Failed,
}

pub struct Keeper {
    scanner: Arc<UpkeepScanner>,
    coordinator: Arc<ExecutionCoordinator>,
    registry: Arc<AgentRegistry>,
    oracle: Arc<dyn PriceOracle>,
    updates: Arc<dyn UpdateSource>,
    interval_secs: u64,
    scan_budget: usize,
}

impl Keeper {
    pub fn new(
        scanner: Arc<UpkeepScanner>,
        coordinator: Arc<ExecutionCoordinator>,
        registry: Arc<AgentRegistry>,
        oracle: Arc<dyn PriceOracle>,
        updates: Arc<dyn UpdateSource>,
        interval_secs: u64,
        scan_budget: usize,
    ) -> Self {
        Self {
            scanner,
            coordinator,
            registry,
            oracle,
            updates,
            interval_secs,
            scan_budget,
        }
    }

    /// Run cycles until `shutdown` flips. An in-flight cycle always
    /// completes; only the next one is skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.interval_secs,
            scan_budget = self.scan_budget,
            "keeper started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let stats = self.cycle().await;
                    tracing::info!(
                        candidates = stats.scanned,
                        executed = stats.executed,
                        skipped = stats.skipped,
                        failed = stats.failed,
                        "keeper cycle complete"
                    );
                }
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested, stopping keeper");
                    break;
                }
            }
        }
    }

    /// One scan-fetch-execute pass. Candidates are processed concurrently;
    /// each failure is contained to its agent.
    pub async fn cycle(&self) -> CycleStats {
        let now = unix_now();
        let candidates = self.scanner.scan(now, self.scan_budget).await;

        let outcomes = join_all(
            candidates
                .iter()
                .map(|id| self.process_candidate(*id)),
        )
        .await;

        let mut stats = CycleStats {
            scanned: candidates.len(),
            ..CycleStats::default()
        };
        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Executed => stats.executed += 1,
                CandidateOutcome::Skipped => stats.skipped += 1,
                CandidateOutcome::Failed => stats.failed += 1,
            }
        }
        stats
    }

    async fn process_candidate(&self, id: AgentId) -> CandidateOutcome {
        let agent = match self.registry.get(id) {
            Ok(agent) => agent,
            Err(e) => {
                tracing::warn!(agent_id = %id, error = %e, "candidate disappeared before execution");
                return CandidateOutcome::Failed;
            }
        };

        // Best effort: a failed payload fetch just means executing against
        // the adapter's current observation instead.
        let update = match self.updates.latest_update_payload(agent.strategy.price_feed_id).await {
            Ok(payload) => {
                let fee_provided = match self.oracle.get_update_fee(&payload).await {
                    Ok(fee) => fee,
                    Err(e) => {
                        tracing::warn!(agent_id = %id, error = %e, "update fee quote failed");
                        return CandidateOutcome::Failed;
                    }
                };
                Some(PriceUpdate {
                    payload,
                    fee_provided,
                })
            }
            Err(e) => {
                tracing::warn!(agent_id = %id, error = %e, "update payload fetch failed, executing without update");
                None
            }
        };

        match self.coordinator.execute(id, update).await {
            Ok(record) => {
                tracing::info!(
                    agent_id = %id,
                    amount_in = %record.amount_in,
                    amount_out = %record.amount_out,
                    "keeper executed agent"
                );
                CandidateOutcome::Executed
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(agent_id = %id, error = %e, "candidate not executable this cycle");
                CandidateOutcome::Skipped
            }
            Err(e) => {
                tracing::warn!(agent_id = %id, error = %e, "execution failed, will retry next cycle");
                CandidateOutcome::Failed
            }
        }
    }
}
