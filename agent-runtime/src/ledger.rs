//! Token balance capability. The coordinator resolves "swap the full
//! balance" inside the atomic execution unit, so this is queried both at
//! scan time (skip filter) and again under the commit lock.

use alloy::primitives::{Address, U256};
use alloy::providers::RootProvider;
use alloy::sol;
use async_trait::async_trait;

use crate::error::AgentError;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn balance_of(&self, holder: Address, token: Address) -> Result<U256, AgentError>;
}

/// ERC-20 balance reads over a JSON-RPC endpoint.
pub struct Erc20Ledger {
    provider: RootProvider,
}

impl Erc20Ledger {
    pub fn new(rpc_url: &str) -> Result<Self, AgentError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| AgentError::ConfigError(format!("Invalid RPC URL: {e}")))?;
        Ok(Self {
            provider: RootProvider::new_http(url),
        })
    }
}

#[async_trait]
impl TokenLedger for Erc20Ledger {
    async fn balance_of(&self, holder: Address, token: Address) -> Result<U256, AgentError> {
        let erc20 = IERC20::new(token, &self.provider);
        erc20
            .balanceOf(holder)
            .call()
            .await
            .map_err(|e| AgentError::HttpError(format!("balanceOf failed: {e}")))
    }
}
