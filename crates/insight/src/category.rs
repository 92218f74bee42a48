use regex::Regex;
use std::sync::LazyLock;

/// Anything that looks like a base58 Solana address embedded in the query.
static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[a-zA-Z0-9]{32,44}").expect("valid address pattern"));

/// Coarse query buckets used for the per-day activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCategory {
    Identity,
    WalletAnalysis,
    TokenMetrics,
    VoiceNode,
    SystemActivity,
    Education,
    General,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::WalletAnalysis => "wallet_analysis",
            Self::TokenMetrics => "token_metrics",
            Self::VoiceNode => "voice_node",
            Self::SystemActivity => "system_activity",
            Self::Education => "education",
            Self::General => "general",
        }
    }
}

/// Keyword classification of a user query. First matching rule wins; the
/// address pattern runs on the raw message since base58 is case-sensitive.
pub fn categorize(message: &str) -> QueryCategory {
    let lower = message.to_lowercase();

    if lower.contains("who am i") || lower.contains("know me") || lower.contains("identity") {
        return QueryCategory::Identity;
    }
    if lower.contains("wallet") || lower.contains("address") || ADDRESS_PATTERN.is_match(message) {
        return QueryCategory::WalletAnalysis;
    }
    if lower.contains("price")
        || lower.contains("market")
        || lower.contains("token")
        || lower.contains("value")
    {
        return QueryCategory::TokenMetrics;
    }
    if lower.contains("prophecy") || lower.contains("sentiment") || lower.contains("voice") {
        return QueryCategory::VoiceNode;
    }
    if lower.contains("activity") || lower.contains("donation") || lower.contains("transaction") {
        return QueryCategory::SystemActivity;
    }
    if lower.contains("what is") || lower.contains("explain") || lower.contains("how does") {
        return QueryCategory::Education;
    }
    QueryCategory::General
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_queries() {
        assert_eq!(categorize("Who am I?"), QueryCategory::Identity);
        assert_eq!(categorize("do you know me"), QueryCategory::Identity);
    }

    #[test]
    fn test_wallet_queries_by_keyword() {
        assert_eq!(categorize("tell me about my wallet"), QueryCategory::WalletAnalysis);
        assert_eq!(categorize("what is this address"), QueryCategory::WalletAnalysis);
    }

    #[test]
    fn test_wallet_queries_by_embedded_address() {
        assert_eq!(
            categorize("analyze 9TyzcephhXEw67piYNc72EJtgVmbq3AZhyPFSvdfXWdr please"),
            QueryCategory::WalletAnalysis
        );
    }

    #[test]
    fn test_identity_wins_over_wallet() {
        assert_eq!(
            categorize("identity for wallet 9TyzcephhXEw67piYNc72EJtgVmbq3AZhyPFSvdfXWdr"),
            QueryCategory::Identity
        );
    }

    #[test]
    fn test_token_metrics() {
        assert_eq!(categorize("current price?"), QueryCategory::TokenMetrics);
        assert_eq!(categorize("market cap"), QueryCategory::TokenMetrics);
    }

    #[test]
    fn test_voice_node() {
        assert_eq!(categorize("latest prophecy"), QueryCategory::VoiceNode);
        assert_eq!(categorize("sentiment now"), QueryCategory::VoiceNode);
    }

    #[test]
    fn test_system_activity() {
        assert_eq!(categorize("recent donations"), QueryCategory::SystemActivity);
    }

    #[test]
    fn test_education() {
        assert_eq!(categorize("how does the system work"), QueryCategory::Education);
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(categorize("hello"), QueryCategory::General);
        // A 31-char run is too short to read as an address.
        assert_eq!(categorize(&"a".repeat(31)), QueryCategory::General);
    }
}
