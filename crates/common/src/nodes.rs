use crate::types::{VisitorsPayload, WalletEventsPayload};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

/// HTTP client for the Voice and Value node function endpoints.
///
/// Most payloads are passed through opaquely: the agent only reshapes them
/// into tool results for the model. Only the analytics/visitor payloads,
/// which feed the correlator, get typed decoding.
pub struct NodeClient {
    voice_base: String,
    value_base: String,
    visitor_base: String,
    client: reqwest::Client,
}

impl NodeClient {
    pub fn new(voice_base: &str, value_base: &str, visitor_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            voice_base: voice_base.trim_end_matches('/').to_string(),
            value_base: value_base.trim_end_matches('/').to_string(),
            visitor_base: visitor_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn voice_url(&self, function: &str) -> String {
        format!("{}/{function}", self.voice_base)
    }

    pub fn value_url(&self, function: &str) -> String {
        format!("{}/{function}", self.value_base)
    }

    pub fn visitor_url(&self, function: &str) -> String {
        format!("{}/{function}", self.visitor_base)
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!(url = %url, "fetching node function");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("{url} returned {status}");
        }

        resp.json()
            .await
            .with_context(|| format!("failed to decode JSON from {url}"))
    }

    // --- Voice node ---

    pub async fn sentiment(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("sentiment-get")).await
    }

    pub async fn prophecy(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("prophecy-get")).await
    }

    pub async fn wallet_status(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("wallet-status")).await
    }

    pub async fn transmission_log(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("transmission-log-get")).await
    }

    pub async fn ai_logs(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("ai-logs-get")).await
    }

    pub async fn heartbeat(&self) -> Result<serde_json::Value> {
        self.get_json(&self.voice_url("heartbeat-get")).await
    }

    /// Wallet-connection events recorded by the Voice node tracker.
    pub async fn wallet_events(&self) -> Result<WalletEventsPayload> {
        let url = self.voice_url("analytics-get");
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).with_context(|| format!("unexpected payload from {url}"))
    }

    // --- Value node ---

    pub async fn summary(&self) -> Result<serde_json::Value> {
        self.get_json(&self.value_url("summary")).await
    }

    pub async fn metrics(&self) -> Result<serde_json::Value> {
        self.get_json(&self.value_url("metrics")).await
    }

    /// Visitor records from the Value node tracker. Deployed separately
    /// from the token metrics functions, hence the dedicated base URL.
    pub async fn visitors(&self) -> Result<VisitorsPayload> {
        let url = self.visitor_url("visitor-get");
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).with_context(|| format!("unexpected payload from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> NodeClient {
        NodeClient::new(
            "https://badseed.netlify.app/.netlify/functions/",
            "https://badseed-token.netlify.app/.netlify/functions",
            "https://badseedtoken.netlify.app/.netlify/functions",
        )
    }

    #[test]
    fn test_voice_url_trims_trailing_slash() {
        let client = test_client();
        assert_eq!(
            client.voice_url("sentiment-get"),
            "https://badseed.netlify.app/.netlify/functions/sentiment-get"
        );
    }

    #[test]
    fn test_value_and_visitor_bases_are_distinct() {
        let client = test_client();
        assert_eq!(
            client.value_url("summary"),
            "https://badseed-token.netlify.app/.netlify/functions/summary"
        );
        assert_eq!(
            client.visitor_url("visitor-get"),
            "https://badseedtoken.netlify.app/.netlify/functions/visitor-get"
        );
    }
}
