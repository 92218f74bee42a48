use crate::types::{IndexedTransaction, WalletBalances};
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the Helius indexer endpoints (enhanced transactions and
/// balances). Non-success responses degrade to empty payloads: the caller
/// still produces a useful, partial wallet analysis.
pub struct HeliusClient {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HeliusClient {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    pub fn transactions_url(&self, address: &str, limit: u32) -> String {
        let encoded = urlencoding::encode(address);
        format!(
            "{}/v0/addresses/{encoded}/transactions?api-key={}&limit={limit}",
            self.api_url, self.api_key
        )
    }

    pub fn balances_url(&self, address: &str) -> String {
        let encoded = urlencoding::encode(address);
        format!(
            "{}/v0/addresses/{encoded}/balances?api-key={}",
            self.api_url, self.api_key
        )
    }

    pub async fn transactions(&self, address: &str, limit: u32) -> Result<Vec<IndexedTransaction>> {
        let url = self.transactions_url(address, limit);
        debug!(address = address, limit = limit, "fetching transactions");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch transactions for {address}"))?;

        if !resp.status().is_success() {
            warn!(address = address, status = %resp.status(), "transactions fetch degraded to empty");
            return Ok(vec![]);
        }

        resp.json()
            .await
            .context("failed to deserialize transactions response")
    }

    pub async fn balances(&self, address: &str) -> Result<WalletBalances> {
        let url = self.balances_url(address);
        debug!(address = address, "fetching balances");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch balances for {address}"))?;

        if !resp.status().is_success() {
            warn!(address = address, status = %resp.status(), "balances fetch degraded to empty");
            return Ok(WalletBalances::default());
        }

        resp.json()
            .await
            .context("failed to deserialize balances response")
    }
}

/// Minimal JSON-RPC client against a public Solana RPC. Used only for the
/// balance-only fallback when no indexer API key is configured.
pub struct RpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(rpc_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            rpc_url: rpc_url.to_string(),
            client,
        }
    }

    /// `getBalance` for an address, in lamports.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address],
        });

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to call getBalance for {address}"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("RPC returned {status}");
        }

        let value: serde_json::Value = resp.json().await.context("invalid RPC response")?;
        parse_balance_reply(&value)
            .with_context(|| format!("unexpected getBalance reply for {address}"))
    }
}

fn parse_balance_reply(value: &serde_json::Value) -> Option<u64> {
    value.get("result")?.get("value")?.as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_url_contains_key_and_limit() {
        let client = HeliusClient::new("https://api.helius.xyz/", "test-key");
        let url = client.transactions_url("9TyzcephhXEw67piYNc72EJtgVmbq3AZhyPFSvdfXWdr", 50);
        assert_eq!(
            url,
            "https://api.helius.xyz/v0/addresses/9TyzcephhXEw67piYNc72EJtgVmbq3AZhyPFSvdfXWdr/transactions?api-key=test-key&limit=50"
        );
    }

    #[test]
    fn test_balances_url() {
        let client = HeliusClient::new("https://api.helius.xyz", "test-key");
        let url = client.balances_url("abc");
        assert!(url.contains("/v0/addresses/abc/balances"));
        assert!(url.contains("api-key=test-key"));
    }

    #[test]
    fn test_url_encodes_address() {
        let client = HeliusClient::new("https://api.helius.xyz", "k");
        let url = client.transactions_url("a/b", 10);
        assert!(url.contains("a%2Fb"));
    }

    #[test]
    fn test_parse_balance_reply() {
        let value = serde_json::json!({"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":2450000000u64}});
        assert_eq!(parse_balance_reply(&value), Some(2_450_000_000));
    }

    #[test]
    fn test_parse_balance_reply_error_shape() {
        let value = serde_json::json!({"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}});
        assert_eq!(parse_balance_reply(&value), None);
    }
}
