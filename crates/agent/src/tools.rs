use crate::llm::{FunctionDeclaration, ToolDefinition};
use chrono::Utc;
use common::config::Config;
use common::nodes::NodeClient;
use common::solana::{HeliusClient, RpcClient};
use common::types::{KnownWallet, VisitorsPayload, WalletBalances};
use insight::correlation::CorrelationSettings;
use insight::profile::{DataSource, ProfileSettings};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{error, warn};

/// The functions exposed to the model. Parameter schemas and descriptions
/// are wire configuration; the behavior lives in `Toolbox::dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    VoiceNodeStatus,
    ValueNodeStatus,
    SystemActivity,
    UserIdentity,
    AnalyzeWallet,
}

impl Tool {
    pub const ALL: [Self; 5] = [
        Self::VoiceNodeStatus,
        Self::ValueNodeStatus,
        Self::SystemActivity,
        Self::UserIdentity,
        Self::AnalyzeWallet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::VoiceNodeStatus => "getVoiceNodeStatus",
            Self::ValueNodeStatus => "getValueNodeStatus",
            Self::SystemActivity => "getSystemActivity",
            Self::UserIdentity => "getUserIdentity",
            Self::AnalyzeWallet => "analyzeWallet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            Self::VoiceNodeStatus => {
                "Fetches current status from the Voice Node (badseed-exposed): sentiment data, latest prophecy, and wallet status"
            }
            Self::ValueNodeStatus => {
                "Fetches current status from the Value Node (badseed-token): token metrics, price, market cap, liquidity, and summary data"
            }
            Self::SystemActivity => {
                "Fetches recent system activity and user interactions: transmission logs from donations, AI narrative generation logs, and system health metrics. Use this to understand what users are doing and how they are engaging with the system."
            }
            Self::UserIdentity => {
                "Correlates user activity across Voice and Value nodes to identify the same user visiting both pages. Returns wallet addresses, IP addresses, locations, and confidence scores. Use when user asks \"who am I?\" or wants identity recognition."
            }
            Self::AnalyzeWallet => {
                "Analyzes a Solana wallet address to provide detailed information about: transaction history, token holdings, BADSEED token balance, interaction patterns with BADSEED system, wallet profile/sentiment, and trading behavior. Use when user asks about a specific wallet address, wants to know about transaction history, or asks questions like \"tell me about wallet X\" or \"what can you tell me about this address\"."
            }
        }
    }

    fn parameters(&self) -> Value {
        match self {
            Self::AnalyzeWallet => json!({
                "type": "object",
                "properties": {
                    "walletAddress": {
                        "type": "string",
                        "description": "The Solana wallet address to analyze (base58 encoded public key)"
                    }
                },
                "required": ["walletAddress"]
            }),
            _ => json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL
            .into_iter()
            .map(|tool| ToolDefinition {
                def_type: "function",
                function: FunctionDeclaration {
                    name: tool.name(),
                    description: tool.description(),
                    parameters: tool.parameters(),
                },
            })
            .collect()
    }
}

/// Executes tool calls against the external collaborators and the insight
/// cores. Every failure path produces a structured JSON error object: the
/// model on the other side of the wire must always receive *some* JSON.
pub struct Toolbox {
    nodes: NodeClient,
    helius: Option<HeliusClient>,
    rpc: RpcClient,
    known_wallets: BTreeMap<String, KnownWallet>,
    correlation: CorrelationSettings,
    profiling: ProfileSettings,
    transaction_limit: u32,
}

impl Toolbox {
    pub fn from_config(config: &Config) -> Self {
        let nodes = NodeClient::new(
            &config.voice_node.base_url,
            &config.value_node.base_url,
            &config.value_node.visitor_base_url,
        );
        let helius = config
            .helius
            .api_key
            .as_deref()
            .map(|key| HeliusClient::new(&config.helius.api_url, key));
        let rpc = RpcClient::new(&config.helius.rpc_url);

        Self {
            nodes,
            helius,
            rpc,
            known_wallets: config.profiling.known_wallet_map(),
            correlation: CorrelationSettings::from_config(&config.correlation),
            profiling: ProfileSettings::from_config(&config.profiling),
            transaction_limit: config.helius.transaction_limit,
        }
    }

    pub async fn dispatch(&self, name: &str, arguments: &str) -> Value {
        metrics::counter!("agent_tool_calls_total", "tool" => name.to_string()).increment(1);

        match Tool::from_name(name) {
            Some(Tool::VoiceNodeStatus) => self.voice_node_status().await,
            Some(Tool::ValueNodeStatus) => self.value_node_status().await,
            Some(Tool::SystemActivity) => self.system_activity().await,
            Some(Tool::UserIdentity) => self.user_identity().await,
            Some(Tool::AnalyzeWallet) => {
                let address = parse_wallet_address(arguments);
                self.analyze_wallet(&address).await
            }
            None => json!({"error": "Unknown function"}),
        }
    }

    async fn voice_node_status(&self) -> Value {
        let (sentiment, prophecy, wallet) = tokio::join!(
            self.nodes.sentiment(),
            self.nodes.prophecy(),
            self.nodes.wallet_status()
        );
        match (sentiment, prophecy, wallet) {
            (Ok(sentiment), Ok(prophecy), Ok(wallet)) => json!({
                "sentiment": sentiment,
                "prophecy": prophecy,
                "wallet": wallet,
            }),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                warn!(error = %e, "voice node fetch failed");
                json!({"error": "Voice Node unavailable", "details": e.to_string()})
            }
        }
    }

    async fn value_node_status(&self) -> Value {
        let (summary, metrics) = tokio::join!(self.nodes.summary(), self.nodes.metrics());
        match (summary, metrics) {
            (Ok(summary), Ok(metrics)) => json!({
                "summary": summary,
                "metrics": metrics,
            }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "value node fetch failed");
                json!({"error": "Value Node unavailable", "details": e.to_string()})
            }
        }
    }

    async fn system_activity(&self) -> Value {
        let (transmission, ai_logs, heartbeat) = tokio::join!(
            self.nodes.transmission_log(),
            self.nodes.ai_logs(),
            self.nodes.heartbeat()
        );
        match (transmission, ai_logs, heartbeat) {
            (Ok(transmission), Ok(ai_logs), Ok(heartbeat)) => {
                let logs = transmission.get("logs").cloned().unwrap_or_else(|| json!([]));
                json!({
                    "transmissionLogs": logs,
                    "aiActivity": ai_logs,
                    "systemHealth": heartbeat,
                })
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                warn!(error = %e, "activity fetch failed");
                json!({"error": "Activity data unavailable", "details": e.to_string()})
            }
        }
    }

    /// The wallet-event source is mandatory; the visitor source degrades to
    /// an empty list so the correlator's partial path stays reachable.
    async fn user_identity(&self) -> Value {
        let events = match self.nodes.wallet_events().await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "wallet event fetch failed");
                return json!({"error": "Correlation service unavailable", "correlations": []});
            }
        };

        let visitors = match self.nodes.visitors().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "visitor data unavailable, degrading to partial");
                VisitorsPayload {
                    recent_visitors: vec![],
                    unique_ips: 0,
                }
            }
        };

        let report = insight::correlation::correlate(
            &events.recent_events,
            &visitors.recent_visitors,
            events.unique_wallets,
            visitors.unique_ips,
            &self.correlation,
        );
        serde_json::to_value(report)
            .unwrap_or_else(|_| json!({"error": "Correlation service unavailable", "correlations": []}))
    }

    async fn analyze_wallet(&self, address: &str) -> Value {
        // Validate before spending any fetches.
        if address.len() < self.profiling.min_address_len
            || address.len() > self.profiling.max_address_len
        {
            return json!({"error": insight::profile::ProfileError::InvalidAddress.to_string()});
        }

        let (transactions, balances, data_source) = match &self.helius {
            Some(helius) => {
                let (transactions, balances) = tokio::join!(
                    helius.transactions(address, self.transaction_limit),
                    helius.balances(address)
                );
                match (transactions, balances) {
                    (Ok(transactions), Ok(balances)) => {
                        (transactions, balances, DataSource::Helius)
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        error!(error = %e, address = address, "wallet analysis fetch failed");
                        return json!({"error": "Wallet analysis failed", "details": e.to_string()});
                    }
                }
            }
            None => {
                let native_balance = match self.rpc.get_balance(address).await {
                    Ok(lamports) => lamports,
                    Err(e) => {
                        warn!(error = %e, address = address, "public RPC fallback failed");
                        0
                    }
                };
                let balances = WalletBalances {
                    tokens: vec![],
                    native_balance,
                };
                (vec![], balances, DataSource::PublicRpc)
            }
        };

        match insight::profile::profile(
            address,
            &transactions,
            &balances,
            &self.known_wallets,
            data_source,
            Utc::now(),
            &self.profiling,
        ) {
            Ok(analysis) => serde_json::to_value(analysis)
                .unwrap_or_else(|e| json!({"error": "Wallet analysis failed", "details": e.to_string()})),
            Err(e) => json!({"error": e.to_string()}),
        }
    }
}

fn parse_wallet_address(arguments: &str) -> String {
    let args: Value = serde_json::from_str(arguments).unwrap_or_else(|_| json!({}));
    args.get("walletAddress")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap()
    }

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("selfDestruct"), None);
    }

    #[test]
    fn test_definitions_cover_all_tools() {
        let definitions = Tool::definitions();
        assert_eq!(definitions.len(), 5);
        let json = serde_json::to_value(&definitions).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "getVoiceNodeStatus");
        assert_eq!(json[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_analyze_wallet_schema_requires_address() {
        let definitions = Tool::definitions();
        let json = serde_json::to_value(&definitions).unwrap();
        let analyze = json
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["function"]["name"] == "analyzeWallet")
            .unwrap();
        assert_eq!(
            analyze["function"]["parameters"]["required"],
            serde_json::json!(["walletAddress"])
        );
    }

    #[test]
    fn test_parse_wallet_address_variants() {
        assert_eq!(parse_wallet_address("{\"walletAddress\":\"abc\"}"), "abc");
        assert_eq!(parse_wallet_address("{}"), "");
        assert_eq!(parse_wallet_address("not json"), "");
        assert_eq!(parse_wallet_address("{\"walletAddress\": 42}"), "");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_function() {
        let toolbox = Toolbox::from_config(&test_config());
        let result = toolbox.dispatch("selfDestruct", "{}").await;
        assert_eq!(result, json!({"error": "Unknown function"}));
    }

    #[tokio::test]
    async fn test_analyze_wallet_rejects_bad_address_without_fetching() {
        let toolbox = Toolbox::from_config(&test_config());
        let result = toolbox
            .dispatch("analyzeWallet", "{\"walletAddress\":\"short\"}")
            .await;
        assert_eq!(
            result["error"],
            "Invalid wallet address format. Please provide a valid Solana address."
        );
    }

    #[tokio::test]
    async fn test_analyze_wallet_rejects_missing_address() {
        let toolbox = Toolbox::from_config(&test_config());
        let result = toolbox.dispatch("analyzeWallet", "{}").await;
        assert!(result["error"]
            .as_str()
            .unwrap()
            .contains("Invalid wallet address format"));
    }
}
