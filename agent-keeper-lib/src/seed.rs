//! Agent seed file: a JSON array of agent definitions loaded at startup so
//! a fresh keeper process starts with a known population.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use agent_runtime::store::AgentRegistry;
use agent_runtime::{AgentError, AgentId, Strategy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSeed {
    pub id: AgentId,
    pub owner: Address,
    pub label: String,
    pub strategy: Strategy,
}

pub fn load_seeds(path: &Path) -> Result<Vec<AgentSeed>, AgentError> {
    let raw = std::fs::read(path)
        .map_err(|e| AgentError::ConfigError(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Create each seed agent, skipping ids that already exist. Returns how many
/// were created; individually rejected seeds are logged and do not stop the
/// rest.
pub async fn seed_registry(registry: &Arc<AgentRegistry>, seeds: Vec<AgentSeed>) -> usize {
    let mut created = 0;
    for seed in seeds {
        match registry
            .create(seed.id, seed.owner, &seed.label, seed.strategy)
            .await
        {
            Ok(node) => {
                tracing::info!(agent_id = %seed.id, label = seed.label, ens_node = %node, "seed agent created");
                created += 1;
            }
            Err(AgentError::AlreadyExists) => {
                tracing::debug!(agent_id = %seed.id, "seed agent already present");
            }
            Err(e) => {
                tracing::warn!(agent_id = %seed.id, error = %e, "seed agent rejected");
            }
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_runtime::PriceObservation;
    use agent_runtime::naming::{NameBinder, namehash};
    use agent_runtime::oracle::PriceOracle;
    use agent_runtime::unix_now;
    use alloy::primitives::{B256, U256};
    use async_trait::async_trait;
    use std::io::Write;

    struct AnyFeedOracle;

    #[async_trait]
    impl PriceOracle for AnyFeedOracle {
        async fn get_price(&self, _feed: B256) -> Result<PriceObservation, AgentError> {
            Ok(PriceObservation {
                price: 1,
                expo: -8,
                publish_time: unix_now(),
            })
        }
        async fn get_update_fee(&self, _payload: &[u8]) -> Result<U256, AgentError> {
            Ok(U256::ZERO)
        }
        async fn apply_update(&self, _payload: &[u8], fee: U256) -> Result<U256, AgentError> {
            Ok(fee)
        }
        async fn resolve_feed(&self, _feed: B256) -> Result<bool, AgentError> {
            Ok(true)
        }
    }

    struct LocalBinder;

    #[async_trait]
    impl NameBinder for LocalBinder {
        async fn bind_subname(&self, label: &str, _owner: Address) -> Result<B256, AgentError> {
            Ok(namehash(&format!("{label}.agents.eth")))
        }
    }

    fn seed(id_byte: u8, label: &str) -> AgentSeed {
        AgentSeed {
            id: B256::repeat_byte(id_byte),
            owner: Address::repeat_byte(1),
            label: label.to_string(),
            strategy: Strategy {
                price_feed_id: B256::repeat_byte(0xe6),
                trigger_price: U256::from(3000_00000000u64),
                trigger_above: true,
                token_in: Address::repeat_byte(0x0a),
                token_out: Address::repeat_byte(0x0b),
                amount_in: U256::ZERO,
                min_return_amount: U256::ZERO,
                is_active: true,
                last_executed: 0,
                cooldown_period: 3600,
            },
        }
    }

    #[test]
    fn test_load_seeds_round_trip() {
        let seeds = vec![seed(1, "alice"), seed(2, "bob")];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec(&seeds).unwrap()).unwrap();

        let loaded = load_seeds(file.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].label, "alice");
        assert_eq!(loaded[1].id, B256::repeat_byte(2));
        assert_eq!(loaded[0].strategy, seeds[0].strategy);
    }

    #[test]
    fn test_load_seeds_missing_file() {
        let err = load_seeds(Path::new("/nonexistent/agents.json")).unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_seed_registry_skips_duplicates_and_bad_seeds() {
        let registry = Arc::new(AgentRegistry::new(
            Arc::new(AnyFeedOracle),
            Arc::new(LocalBinder),
        ));

        let mut bad = seed(3, "carol");
        bad.strategy.trigger_price = U256::ZERO;

        let created = seed_registry(
            &registry,
            vec![seed(1, "alice"), seed(1, "alice"), seed(2, "bob"), bad],
        )
        .await;
        assert_eq!(created, 2);
        assert_eq!(registry.len(), 2);
    }
}
