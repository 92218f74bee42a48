use anyhow::Result;
use serde::Deserialize;
use std::str::FromStr;

use crate::types::{KnownWallet, WalletRole};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub server: Server,
    pub llm: Llm,
    pub voice_node: VoiceNode,
    pub value_node: ValueNode,
    pub helius: Helius,
    pub activity_log: ActivityLog,
    pub correlation: Correlation,
    pub profiling: Profiling,
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Filled from AGENT_ADMIN_TOKEN; never stored in the TOML file.
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Llm {
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_tool_iterations: u32,
    /// Filled from XAI_API_KEY; never stored in the TOML file.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceNode {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueNode {
    pub base_url: String,
    /// The visitor tracker is deployed on a separate host from the token
    /// metrics functions.
    pub visitor_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Helius {
    pub api_url: String,
    /// Public Solana RPC used for the balance-only fallback when no API key
    /// is configured.
    pub rpc_url: String,
    pub transaction_limit: u32,
    /// Filled from HELIUS_API_KEY; never stored in the TOML file.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityLog {
    pub max_entries: usize,
    pub stats_days: u32,
    /// Filled from UPSTASH_REDIS_REST_URL / UPSTASH_REDIS_REST_TOKEN.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Correlation heuristic policy. The windows and bonuses are behavioral
/// constants carried over from the deployed system, not values derived from
/// data; they live in config so they can be tuned without a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct Correlation {
    pub window_ms: i64,
    pub tight_window_ms: i64,
    pub near_window_ms: i64,
    pub base_confidence: u32,
    pub tight_bonus: u32,
    pub near_bonus: u32,
    pub loose_bonus: u32,
    pub user_agent_bonus: u32,
    pub max_results: usize,
    pub wallet_only_limit: usize,
}

/// Wallet profiling policy: holdings tiers, activity thresholds, and the
/// fixed system-wallet table. Same heuristic-constant caveat as above.
#[derive(Debug, Clone, Deserialize)]
pub struct Profiling {
    pub known_wallets: Vec<KnownWalletEntry>,
    pub badseed_mint: String,
    pub default_token_decimals: u32,
    pub major_holdings_min: f64,
    pub significant_holdings_min: f64,
    pub holder_holdings_min: f64,
    pub very_high_daily_txs: usize,
    pub high_weekly_txs: usize,
    pub moderate_monthly_txs: usize,
    pub speculative_swap_count: u32,
    pub min_address_len: usize,
    pub max_address_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownWalletEntry {
    pub address: String,
    pub name: String,
    pub role: WalletRole,
}

impl Profiling {
    /// The known-wallet table keyed by address, as the profiler consumes it.
    pub fn known_wallet_map(&self) -> std::collections::BTreeMap<String, KnownWallet> {
        self.known_wallets
            .iter()
            .map(|entry| {
                (
                    entry.address.clone(),
                    KnownWallet {
                        name: entry.name.clone(),
                        role: entry.role,
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string("config/default.toml")?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Secrets come from the environment only. A set variable always wins
    /// over whatever the TOML file carries.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("XAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("HELIUS_API_KEY") {
            self.helius.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("UPSTASH_REDIS_REST_URL") {
            self.activity_log.url = Some(url);
        }
        if let Ok(token) = std::env::var("UPSTASH_REDIS_REST_TOKEN") {
            self.activity_log.token = Some(token);
        }
        if let Ok(token) = std::env::var("AGENT_ADMIN_TOKEN") {
            self.server.admin_token = Some(token);
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.llm.max_tool_iterations >= 1,
            "llm.max_tool_iterations must be >= 1"
        );
        anyhow::ensure!(
            self.correlation.tight_window_ms < self.correlation.near_window_ms
                && self.correlation.near_window_ms < self.correlation.window_ms,
            "correlation windows must be strictly increasing (tight < near < full)"
        );
        anyhow::ensure!(
            self.correlation.max_results > 0,
            "correlation.max_results must be > 0"
        );
        anyhow::ensure!(
            self.profiling.known_wallets.len() == 3,
            "profiling.known_wallets must list exactly the 3 system wallets"
        );
        anyhow::ensure!(
            self.profiling.major_holdings_min > self.profiling.significant_holdings_min
                && self.profiling.significant_holdings_min > self.profiling.holder_holdings_min,
            "profiling holdings tiers must be strictly decreasing"
        );
        anyhow::ensure!(
            self.helius.transaction_limit > 0,
            "helius.transaction_limit must be > 0"
        );
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
