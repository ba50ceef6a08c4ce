//! Identity binding: mints an ENS subname for an agent at creation time.
//! Binding happens exactly once per agent and is non-retryable; a failed
//! bind fails the creation.

use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::error::AgentError;

#[async_trait]
pub trait NameBinder: Send + Sync {
    /// Bind `label` under the binder's parent namespace for `owner`.
    /// Returns the derived namespace node.
    async fn bind_subname(&self, label: &str, owner: Address) -> Result<B256, AgentError>;
}

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// EIP-137 namehash of a dotted name. The empty name hashes to zero.
pub fn namehash(name: &str) -> B256 {
    let mut node = [0u8; 32];
    for label in name.rsplit('.') {
        if label.is_empty() {
            continue;
        }
        let label_hash = keccak(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&label_hash);
        node = keccak(&buf);
    }
    B256::from(node)
}

/// Node of `label` directly under `parent`.
pub fn subnode(parent: B256, label: &str) -> B256 {
    let label_hash = keccak(label.as_bytes());
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(parent.as_slice());
    buf[32..].copy_from_slice(&label_hash);
    B256::from(keccak(&buf))
}

#[derive(Debug, Serialize)]
struct BindRequest<'a> {
    parent: &'a str,
    label: &'a str,
    owner: Address,
}

/// HTTP client for a subname registrar service holding the parent name.
#[derive(Debug, Clone)]
pub struct SubnameRegistrar {
    base_url: String,
    parent_name: String,
    parent_node: B256,
    client: reqwest::Client,
    timeout: Duration,
}

impl SubnameRegistrar {
    pub fn new(base_url: String, parent_name: String) -> Self {
        let parent_node = namehash(&parent_name);
        Self {
            base_url,
            parent_name,
            parent_node,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl NameBinder for SubnameRegistrar {
    async fn bind_subname(&self, label: &str, owner: Address) -> Result<B256, AgentError> {
        if label.is_empty() || label.contains('.') {
            return Err(AgentError::NamingError(format!(
                "invalid subname label '{label}'"
            )));
        }

        let request = BindRequest {
            parent: &self.parent_name,
            label,
            owner,
        };
        let url = format!("{}/subnames", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AgentError::NamingError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AgentError::NamingError(format!(
                "registrar returned {}",
                resp.status()
            )));
        }
        Ok(subnode(self.parent_node, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_namehash_known_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            format!("{:x}", namehash("eth")),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            format!("{:x}", namehash("foo.eth")),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn test_subnode_matches_namehash() {
        assert_eq!(subnode(namehash("eth"), "foo"), namehash("foo.eth"));
    }

    #[tokio::test]
    async fn test_bind_subname() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subnames"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let registrar = SubnameRegistrar::new(server.uri(), "agents.eth".into());
        let node = registrar
            .bind_subname("alice", Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(node, namehash("alice.agents.eth"));
    }

    #[tokio::test]
    async fn test_bind_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subnames"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let registrar = SubnameRegistrar::new(server.uri(), "agents.eth".into());
        let err = registrar
            .bind_subname("alice", Address::repeat_byte(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NamingError(_)));
    }

    #[tokio::test]
    async fn test_dotted_label_rejected() {
        let registrar = SubnameRegistrar::new("http://unused".into(), "agents.eth".into());
        assert!(
            registrar
                .bind_subname("a.b", Address::repeat_byte(1))
                .await
                .is_err()
        );
    }
}
