use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use common::config;
use common::types::{IndexedTransaction, KnownWallet, TokenBalance, WalletBalances, WalletRole};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 7 * DAY_MS;
const MONTH_MS: i64 = 30 * DAY_MS;

const PUBLIC_RPC_NOTE: &str =
    "Limited data: SOL balance only. Full transaction history requires Helius API.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Invalid wallet address format. Please provide a valid Solana address.")]
    InvalidAddress,
}

/// Where the wallet data came from. Decided once per request by the caller
/// based on available credentials, before any fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Helius,
    PublicRpc,
    None,
}

/// Profiling thresholds. Built from config or test defaults. Holdings tiers
/// are in whole tokens (after decimal scaling); activity thresholds count
/// transactions per recency bucket.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
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

impl ProfileSettings {
    pub fn from_config(p: &config::Profiling) -> Self {
        Self {
            badseed_mint: p.badseed_mint.clone(),
            default_token_decimals: p.default_token_decimals,
            major_holdings_min: p.major_holdings_min,
            significant_holdings_min: p.significant_holdings_min,
            holder_holdings_min: p.holder_holdings_min,
            very_high_daily_txs: p.very_high_daily_txs,
            high_weekly_txs: p.high_weekly_txs,
            moderate_monthly_txs: p.moderate_monthly_txs,
            speculative_swap_count: p.speculative_swap_count,
            min_address_len: p.min_address_len,
            max_address_len: p.max_address_len,
        }
    }

    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            badseed_mint: "3HPpMLK7LjKFqSnCsBYNiijhNTo7dkkx3FCSAHKSpump".to_string(),
            default_token_decimals: 6,
            major_holdings_min: 10_000_000.0,
            significant_holdings_min: 1_000_000.0,
            holder_holdings_min: 100_000.0,
            very_high_daily_txs: 5,
            high_weekly_txs: 10,
            moderate_monthly_txs: 5,
            speculative_swap_count: 20,
            min_address_len: 32,
            max_address_len: 44,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryActivity {
    Trader,
    NftCollector,
    Transactor,
    Holder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Neutral,
    Invested,
    Engaged,
    Speculative,
    CoreInfrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Active,
    Holder,
    None,
}

/// Recency/type statistics over the fetched transaction list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatterns {
    pub activity_level: ActivityLevel,
    pub primary_activity: PrimaryActivity,
    pub last_24h: usize,
    pub last_week: usize,
    pub last_month: usize,
    pub total_analyzed: usize,
    pub transaction_types: BTreeMap<String, u32>,
    pub first_seen: String,
    pub last_seen: String,
}

/// Either a dormant marker (no transactions at all) or the full pattern
/// record. The two shapes match the node JSON contract.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TransactionAnalysis {
    Dormant {
        activity: &'static str,
        pattern: &'static str,
    },
    Active(TransactionPatterns),
}

impl TransactionAnalysis {
    pub fn dormant() -> Self {
        Self::Dormant {
            activity: "dormant",
            pattern: "No recent activity detected",
        }
    }

    pub fn activity_level(&self) -> Option<ActivityLevel> {
        match self {
            Self::Dormant { .. } => None,
            Self::Active(p) => Some(p.activity_level),
        }
    }

    /// Dormant wallets fall through to the holder default.
    pub fn primary_activity(&self) -> PrimaryActivity {
        match self {
            Self::Dormant { .. } => PrimaryActivity::Holder,
            Self::Active(p) => p.primary_activity,
        }
    }

    pub fn swap_count(&self) -> u32 {
        match self {
            Self::Dormant { .. } => 0,
            Self::Active(p) => p.transaction_types.get("SWAP").copied().unwrap_or(0),
        }
    }
}

/// Transactions that touch any of the system wallets: a count plus the
/// de-duplicated type list in first-occurrence order.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionSummary {
    pub count: usize,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WalletProfile {
    System {
        #[serde(rename = "type")]
        profile_type: &'static str,
        role: WalletRole,
        name: String,
        sentiment: Sentiment,
        traits: Vec<String>,
    },
    Standard {
        #[serde(rename = "type")]
        profile_type: PrimaryActivity,
        #[serde(rename = "activityLevel", skip_serializing_if = "Option::is_none")]
        activity_level: Option<ActivityLevel>,
        sentiment: Sentiment,
        traits: Vec<String>,
        #[serde(rename = "badseedEngagement")]
        badseed_engagement: Engagement,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BadseedHoldings {
    pub amount: u64,
    pub decimals: u32,
    pub formatted: String,
}

/// Full derived summary for one wallet. Computed fresh per request, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAnalysis {
    pub address: String,
    pub data_source: DataSource,
    pub data_limitations: Option<&'static str>,
    pub is_known_badseed_wallet: bool,
    pub known_wallet_info: Option<KnownWallet>,
    pub sol_balance: f64,
    pub token_count: usize,
    pub badseed_holdings: Option<BadseedHoldings>,
    pub transaction_count: usize,
    pub transaction_analysis: TransactionAnalysis,
    pub badseed_interactions: InteractionSummary,
    pub wallet_profile: WalletProfile,
    pub suggestions: Vec<String>,
}

/// Derive the wallet analysis from already-fetched data.
///
/// Pure except for the injected `now`, which only feeds the recency
/// bucketing. The only failure is address validation; upstream fetch
/// problems are the caller's to degrade.
pub fn profile(
    address: &str,
    transactions: &[IndexedTransaction],
    balances: &WalletBalances,
    known_wallets: &BTreeMap<String, KnownWallet>,
    data_source: DataSource,
    now: DateTime<Utc>,
    settings: &ProfileSettings,
) -> Result<WalletAnalysis, ProfileError> {
    if address.len() < settings.min_address_len || address.len() > settings.max_address_len {
        return Err(ProfileError::InvalidAddress);
    }

    let known = known_wallets.get(address);
    let analysis = analyze_transactions(transactions, now, settings);
    let badseed_token = balances
        .tokens
        .iter()
        .find(|t| t.mint == settings.badseed_mint);
    let interactions = system_interactions(transactions, known_wallets);

    let wallet_profile = generate_profile(&analysis, badseed_token, &interactions, known, settings);
    let suggestions = generate_suggestions(&analysis, badseed_token, &interactions);

    Ok(WalletAnalysis {
        address: address.to_string(),
        data_source,
        data_limitations: matches!(data_source, DataSource::PublicRpc).then_some(PUBLIC_RPC_NOTE),
        is_known_badseed_wallet: known.is_some(),
        known_wallet_info: known.cloned(),
        sol_balance: balances.native_balance as f64 / 1e9,
        token_count: balances.tokens.len(),
        badseed_holdings: badseed_token.map(|t| BadseedHoldings {
            amount: t.amount,
            decimals: t.decimals.unwrap_or(settings.default_token_decimals),
            formatted: format_token_amount(scaled_amount(t, settings)),
        }),
        transaction_count: transactions.len(),
        transaction_analysis: analysis,
        badseed_interactions: interactions,
        wallet_profile,
        suggestions,
    })
}

/// Bucket transactions into 24h/7d/30d recency windows, tally types, and
/// classify activity level and primary behavior. Transaction timestamps are
/// epoch seconds; the input list is newest first.
pub fn analyze_transactions(
    transactions: &[IndexedTransaction],
    now: DateTime<Utc>,
    settings: &ProfileSettings,
) -> TransactionAnalysis {
    if transactions.is_empty() {
        return TransactionAnalysis::dormant();
    }

    let now_ms = now.timestamp_millis();
    let within = |tx: &&IndexedTransaction, window: i64| now_ms - tx.timestamp * 1000 < window;

    let last_24h = transactions.iter().filter(|tx| within(tx, DAY_MS)).count();
    let last_week = transactions.iter().filter(|tx| within(tx, WEEK_MS)).count();
    let last_month = transactions
        .iter()
        .filter(|tx| within(tx, MONTH_MS))
        .count();

    let mut transaction_types: BTreeMap<String, u32> = BTreeMap::new();
    for tx in transactions {
        let key = tx.tx_type.clone().unwrap_or_else(|| "UNKNOWN".to_string());
        *transaction_types.entry(key).or_insert(0) += 1;
    }

    let activity_level = if last_24h > settings.very_high_daily_txs {
        ActivityLevel::VeryHigh
    } else if last_week > settings.high_weekly_txs {
        ActivityLevel::High
    } else if last_month > settings.moderate_monthly_txs {
        ActivityLevel::Moderate
    } else {
        ActivityLevel::Low
    };

    let count = |key: &str| transaction_types.get(key).copied().unwrap_or(0);
    let swaps = count("SWAP");
    let transfers = count("TRANSFER");
    let nft_activity = count("NFT_SALE") + count("NFT_MINT") + count("NFT_LISTING");

    // Strictly-greatest comparisons: ties fall through to the next rule and
    // ultimately to holder.
    let primary_activity = if swaps > transfers && swaps > nft_activity {
        PrimaryActivity::Trader
    } else if nft_activity > swaps && nft_activity > transfers {
        PrimaryActivity::NftCollector
    } else if transfers > swaps {
        PrimaryActivity::Transactor
    } else {
        PrimaryActivity::Holder
    };

    let oldest = transactions[transactions.len() - 1].timestamp;
    let newest = transactions[0].timestamp;

    TransactionAnalysis::Active(TransactionPatterns {
        activity_level,
        primary_activity,
        last_24h,
        last_week,
        last_month,
        total_analyzed: transactions.len(),
        transaction_types,
        first_seen: iso_seconds(oldest),
        last_seen: iso_seconds(newest),
    })
}

fn system_interactions(
    transactions: &[IndexedTransaction],
    known_wallets: &BTreeMap<String, KnownWallet>,
) -> InteractionSummary {
    let mut count = 0;
    let mut types: Vec<String> = Vec::new();
    for tx in transactions {
        let Some(accounts) = &tx.account_data else {
            continue;
        };
        if accounts
            .iter()
            .any(|entry| known_wallets.contains_key(&entry.account))
        {
            count += 1;
            let ty = tx.tx_type.clone().unwrap_or_else(|| "UNKNOWN".to_string());
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
    }
    InteractionSummary { count, types }
}

fn generate_profile(
    analysis: &TransactionAnalysis,
    badseed_token: Option<&TokenBalance>,
    interactions: &InteractionSummary,
    known: Option<&KnownWallet>,
    settings: &ProfileSettings,
) -> WalletProfile {
    // System wallets get a fixed profile regardless of observed activity.
    if let Some(wallet) = known {
        return WalletProfile::System {
            profile_type: "system_wallet",
            role: wallet.role,
            name: wallet.name.clone(),
            sentiment: Sentiment::CoreInfrastructure,
            traits: vec![
                "Official BADSEED wallet".to_string(),
                format!("Role: {}", wallet.role.as_str()),
            ],
        };
    }

    let mut traits: Vec<String> = Vec::new();
    let mut sentiment = Sentiment::Neutral;

    match analysis.activity_level() {
        Some(ActivityLevel::VeryHigh) => traits.push("Highly active trader".to_string()),
        Some(ActivityLevel::High) => traits.push("Active participant".to_string()),
        Some(ActivityLevel::Low) => traits.push("Passive holder".to_string()),
        Some(ActivityLevel::Moderate) | None => {}
    }

    if let Some(token) = badseed_token {
        if token.amount > 0 {
            let amount = scaled_amount(token, settings);
            let tier = if amount > settings.major_holdings_min {
                "Major BADSEED holder"
            } else if amount > settings.significant_holdings_min {
                "Significant BADSEED holder"
            } else if amount > settings.holder_holdings_min {
                "BADSEED holder"
            } else {
                "Minor BADSEED holder"
            };
            traits.push(tier.to_string());
            sentiment = Sentiment::Invested;
        }
    }

    if interactions.count > 0 {
        traits.push(format!("{} BADSEED system interactions", interactions.count));
        sentiment = Sentiment::Engaged;
    }

    match analysis.primary_activity() {
        PrimaryActivity::Trader => {
            traits.push("Active swap activity".to_string());
            if analysis.swap_count() > settings.speculative_swap_count {
                sentiment = Sentiment::Speculative;
            }
        }
        PrimaryActivity::NftCollector => traits.push("NFT collector".to_string()),
        PrimaryActivity::Transactor | PrimaryActivity::Holder => {}
    }

    let badseed_engagement = if interactions.count > 0 {
        Engagement::Active
    } else if badseed_token.is_some() {
        Engagement::Holder
    } else {
        Engagement::None
    };

    WalletProfile::Standard {
        profile_type: analysis.primary_activity(),
        activity_level: analysis.activity_level(),
        sentiment,
        traits,
        badseed_engagement,
    }
}

fn generate_suggestions(
    analysis: &TransactionAnalysis,
    badseed_token: Option<&TokenBalance>,
    interactions: &InteractionSummary,
) -> Vec<String> {
    // Fixed order: output reproducibility matters to downstream consumers.
    let mut suggestions = vec![
        "Transaction signature lookup available for detailed tx analysis".to_string(),
        "Token transfer history can be tracked".to_string(),
    ];

    if badseed_token.is_none() {
        suggestions.push(
            "Wallet has no BADSEED holdings - could analyze acquisition patterns if tokens are added"
                .to_string(),
        );
    } else {
        suggestions
            .push("BADSEED holdings detected - can track entry price and holding duration".to_string());
    }

    if interactions.count > 0 {
        suggestions.push("Cross-reference with Voice Node donation logs for correlation".to_string());
    }

    if analysis.activity_level() == Some(ActivityLevel::VeryHigh)
        || analysis.primary_activity() == PrimaryActivity::Trader
    {
        suggestions.push(
            "High trading frequency - consider analyzing swap patterns and DEX preferences"
                .to_string(),
        );
    }

    suggestions
}

fn scaled_amount(token: &TokenBalance, settings: &ProfileSettings) -> f64 {
    let decimals = token.decimals.unwrap_or(settings.default_token_decimals);
    token.amount as f64 / 10f64.powi(decimals as i32)
}

/// Thousands-separated rendering with up to three fractional digits, the
/// way the node UIs already display holdings.
fn format_token_amount(value: f64) -> String {
    let fixed = format!("{value:.3}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*b as char);
    }

    if frac.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac}")
    }
}

fn iso_seconds(timestamp_secs: i64) -> String {
    match Utc.timestamp_opt(timestamp_secs, 0).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "1970-01-01T00:00:00.000Z".to_string(),
    }
}
