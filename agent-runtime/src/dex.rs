//! DEX-aggregation capability: quotes a route, then performs the swap with a
//! minimum-return guarantee. A revert or a short return is a tagged
//! `SwapFailed` error, never an unchecked branch, so the coordinator's
//! rollback path always sees it.

use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::types::SwapQuote;

#[async_trait]
pub trait DexAggregator: Send + Sync {
    /// Quote the route for a prospective swap. Routing data is opaque and
    /// handed back verbatim to `swap`.
    async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount: U256,
    ) -> Result<SwapQuote, AgentError>;

    /// Execute the swap. Returns the realized output amount; anything below
    /// `min_return`, any revert, and any transport error is `SwapFailed`.
    async fn swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount: U256,
        min_return: U256,
        routing_data: &serde_json::Value,
    ) -> Result<U256, AgentError>;
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    dst_amount: String,
    #[serde(default)]
    routing: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SwapRequest<'a> {
    src: Address,
    dst: Address,
    amount: String,
    min_return: String,
    routing: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SwapResponse {
    amount_out: String,
}

#[derive(Debug, Deserialize)]
struct SwapErrorResponse {
    #[serde(default)]
    error: String,
}

/// HTTP client for a 1inch-style aggregation service.
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AggregatorClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse_u256(s: &str) -> Result<U256, AgentError> {
        U256::from_str_radix(s, 10)
            .map_err(|e| AgentError::SwapFailed(format!("unparseable amount '{s}': {e}")))
    }
}

#[async_trait]
impl DexAggregator for AggregatorClient {
    async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount: U256,
    ) -> Result<SwapQuote, AgentError> {
        let url = format!(
            "{}/quote?src={token_in}&dst={token_out}&amount={amount}",
            self.base_url
        );
        let resp = self.client.get(&url).timeout(self.timeout).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::SwapFailed(format!(
                "quote endpoint returned {}",
                resp.status()
            )));
        }
        let body: QuoteResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::SwapFailed(e.to_string()))?;
        Ok(SwapQuote {
            expected_out: Self::parse_u256(&body.dst_amount)?,
            routing_data: body.routing,
        })
    }

    async fn swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount: U256,
        min_return: U256,
        routing_data: &serde_json::Value,
    ) -> Result<U256, AgentError> {
        let url = format!("{}/swap", self.base_url);
        let request = SwapRequest {
            src: token_in,
            dst: token_out,
            amount: amount.to_string(),
            min_return: min_return.to_string(),
            routing: routing_data,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp
                .json::<SwapErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_default();
            return Err(AgentError::SwapFailed(format!(
                "aggregator returned {status}: {detail}"
            )));
        }

        let body: SwapResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::SwapFailed(e.to_string()))?;
        let amount_out = Self::parse_u256(&body.amount_out)?;

        // The service is expected to enforce the floor itself; re-checking
        // here keeps the atomicity contract independent of its behavior.
        if amount_out < min_return {
            return Err(AgentError::SwapFailed(format!(
                "returned {amount_out} below minimum {min_return}"
            )));
        }
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_A: Address = Address::repeat_byte(0x0a);
    const TOKEN_B: Address = Address::repeat_byte(0x0b);

    #[tokio::test]
    async fn test_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dst_amount": "990000",
                "routing": { "pools": ["0xabc"] }
            })))
            .mount(&server)
            .await;

        let client = AggregatorClient::new(server.uri());
        let quote = client
            .quote(TOKEN_A, TOKEN_B, U256::from(1_000_000u64))
            .await
            .unwrap();
        assert_eq!(quote.expected_out, U256::from(990_000u64));
        assert!(quote.routing_data.get("pools").is_some());
    }

    #[tokio::test]
    async fn test_swap_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amount_out": "995000"
            })))
            .mount(&server)
            .await;

        let client = AggregatorClient::new(server.uri());
        let out = client
            .swap(
                TOKEN_A,
                TOKEN_B,
                U256::from(1_000_000u64),
                U256::from(990_000u64),
                &serde_json::Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(out, U256::from(995_000u64));
    }

    #[tokio::test]
    async fn test_swap_revert_is_swap_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "Reverted: insufficient output"
            })))
            .mount(&server)
            .await;

        let client = AggregatorClient::new(server.uri());
        let err = client
            .swap(
                TOKEN_A,
                TOKEN_B,
                U256::from(1_000_000u64),
                U256::from(990_000u64),
                &serde_json::Value::Null,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SwapFailed(_)));
    }

    #[tokio::test]
    async fn test_swap_short_return_is_swap_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amount_out": "1"
            })))
            .mount(&server)
            .await;

        let client = AggregatorClient::new(server.uri());
        let err = client
            .swap(
                TOKEN_A,
                TOKEN_B,
                U256::from(1_000_000u64),
                U256::from(990_000u64),
                &serde_json::Value::Null,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SwapFailed(_)));
    }

    #[tokio::test]
    async fn test_swap_endpoint_down_is_transport_error() {
        let client = AggregatorClient::new("http://localhost:1".into())
            .with_timeout(Duration::from_millis(100));
        let err = client
            .swap(
                TOKEN_A,
                TOKEN_B,
                U256::from(1u64),
                U256::ZERO,
                &serde_json::Value::Null,
            )
            .await
            .unwrap_err();
        assert!(err.is_external());
    }
}
