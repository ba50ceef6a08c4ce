//! Price oracle capability and its Hermes-style HTTP implementation.
//!
//! The capability mirrors a pull oracle: callers may submit an opaque update
//! payload against a quoted fee to advance the feed, then read the current
//! observation. `HermesClient` keeps the applied observations in a local
//! cache so `get_price` can serve the best available value even when the
//! upstream endpoint is briefly down.

use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::types::{FeedId, PriceObservation, unix_now};

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current observation for a feed, freshness not guaranteed.
    async fn get_price(&self, feed: FeedId) -> Result<PriceObservation, AgentError>;

    /// Current observation, rejected with `StalePrice` if older than `max_age` seconds.
    async fn get_price_no_older_than(
        &self,
        feed: FeedId,
        max_age: u64,
    ) -> Result<PriceObservation, AgentError> {
        let obs = self.get_price(feed).await?;
        let now = unix_now();
        if now.saturating_sub(obs.publish_time) > max_age {
            return Err(AgentError::StalePrice {
                published: obs.publish_time,
                now,
                max_age,
            });
        }
        Ok(obs)
    }

    /// Fee required to apply the given update payload.
    async fn get_update_fee(&self, payload: &[u8]) -> Result<U256, AgentError>;

    /// Apply an update payload, paying `fee_paid`. Returns the refund owed
    /// for any excess payment. Fails with `InsufficientFee` if underpaid.
    async fn apply_update(&self, payload: &[u8], fee_paid: U256) -> Result<U256, AgentError>;

    /// Whether the adapter can resolve this feed id at all. Used at agent
    /// creation to fail fast instead of registering a permanently-dead agent.
    async fn resolve_feed(&self, feed: FeedId) -> Result<bool, AgentError>;
}

/// Source of fresh update payloads, polled by the keeper before execution.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn latest_update_payload(&self, feed: FeedId) -> Result<Vec<u8>, AgentError>;
}

/// One feed entry inside an update payload. A payload is the JSON encoding
/// of a `Vec<FeedUpdate>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedUpdate {
    pub id: FeedId,
    pub price: i64,
    pub expo: i32,
    pub publish_time: u64,
}

#[derive(Debug, Deserialize)]
struct LatestPriceResponse {
    parsed: Vec<ParsedFeed>,
}

#[derive(Debug, Deserialize)]
struct ParsedFeed {
    id: String,
    price: ParsedPrice,
}

#[derive(Debug, Deserialize)]
struct ParsedPrice {
    price: String,
    expo: i32,
    publish_time: u64,
}

/// HTTP client for a Hermes-style price service.
#[derive(Debug)]
pub struct HermesClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    fee_per_update: U256,
    applied: DashMap<FeedId, PriceObservation>,
}

impl HermesClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
            fee_per_update: U256::ZERO,
            applied: DashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-feed fee charged when applying an update payload.
    pub fn with_fee_per_update(mut self, fee: U256) -> Self {
        self.fee_per_update = fee;
        self
    }

    async fn fetch_latest(&self, feed: FeedId) -> Result<PriceObservation, AgentError> {
        let url = format!("{}/v2/updates/price/latest?ids[]={feed}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::InvalidPriceFeed);
        }
        if !resp.status().is_success() {
            return Err(AgentError::OracleError(format!(
                "price endpoint returned {}",
                resp.status()
            )));
        }

        let body: LatestPriceResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::OracleError(e.to_string()))?;

        let wanted = format!("{feed:x}");
        let parsed = body
            .parsed
            .into_iter()
            .find(|p| p.id.trim_start_matches("0x").eq_ignore_ascii_case(&wanted))
            .ok_or(AgentError::InvalidPriceFeed)?;

        let mantissa: i64 = parsed
            .price
            .price
            .parse()
            .map_err(|e| AgentError::OracleError(format!("unparseable mantissa: {e}")))?;

        Ok(PriceObservation {
            price: mantissa,
            expo: parsed.price.expo,
            publish_time: parsed.price.publish_time,
        })
    }

    fn decode_payload(payload: &[u8]) -> Result<Vec<FeedUpdate>, AgentError> {
        serde_json::from_slice(payload)
            .map_err(|e| AgentError::PriceNotUpdated(format!("malformed update payload: {e}")))
    }
}

#[async_trait]
impl PriceOracle for HermesClient {
    async fn get_price(&self, feed: FeedId) -> Result<PriceObservation, AgentError> {
        let cached = self.applied.get(&feed).map(|o| *o);
        match self.fetch_latest(feed).await {
            Ok(fresh) => match cached {
                Some(c) if c.publish_time > fresh.publish_time => Ok(c),
                _ => Ok(fresh),
            },
            Err(AgentError::InvalidPriceFeed) => Err(AgentError::InvalidPriceFeed),
            // Upstream down: serve the last applied observation if we have one.
            Err(e) => cached.ok_or(e),
        }
    }

    async fn get_update_fee(&self, payload: &[u8]) -> Result<U256, AgentError> {
        let updates = Self::decode_payload(payload)?;
        Ok(self.fee_per_update * U256::from(updates.len() as u64))
    }

    async fn apply_update(&self, payload: &[u8], fee_paid: U256) -> Result<U256, AgentError> {
        let updates = Self::decode_payload(payload)?;
        let required = self.fee_per_update * U256::from(updates.len() as u64);
        if fee_paid < required {
            return Err(AgentError::InsufficientFee {
                provided: fee_paid,
                required,
            });
        }
        for update in updates {
            let obs = PriceObservation {
                price: update.price,
                expo: update.expo,
                publish_time: update.publish_time,
            };
            // Never let an older payload roll a feed backwards.
            match self.applied.get(&update.id).map(|o| o.publish_time) {
                Some(existing) if existing >= obs.publish_time => {}
                _ => {
                    self.applied.insert(update.id, obs);
                }
            }
        }
        Ok(fee_paid - required)
    }

    async fn resolve_feed(&self, feed: FeedId) -> Result<bool, AgentError> {
        match self.fetch_latest(feed).await {
            Ok(_) => Ok(true),
            Err(AgentError::InvalidPriceFeed) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl UpdateSource for HermesClient {
    async fn latest_update_payload(&self, feed: FeedId) -> Result<Vec<u8>, AgentError> {
        let obs = self.fetch_latest(feed).await?;
        let updates = vec![FeedUpdate {
            id: feed,
            price: obs.price,
            expo: obs.expo,
            publish_time: obs.publish_time,
        }];
        Ok(serde_json::to_vec(&updates)?)
    }
}
