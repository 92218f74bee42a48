use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletRole {
    Creator,
    Donations,
    Token,
}

impl WalletRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Donations => "donations",
            Self::Token => "token",
        }
    }
}

/// One of the three fixed system wallets (creator, donations, token mint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownWallet {
    pub name: String,
    pub role: WalletRole,
}

/// Wallet-connection event from the Voice node's `analytics-get` function.
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEvent {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    pub timestamp: i64,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletEventsPayload {
    #[serde(rename = "recentEvents", default)]
    pub recent_events: Vec<WalletEvent>,
    #[serde(rename = "uniqueWallets", default)]
    pub unique_wallets: u32,
}

/// Visitor record from the Value node's `visitor-get` function.
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct VisitorRecord {
    pub ip: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub timestamp: i64,
    #[serde(rename = "userAgent")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitorsPayload {
    #[serde(rename = "recentVisitors", default)]
    pub recent_visitors: Vec<VisitorRecord>,
    #[serde(rename = "uniqueIPs", default)]
    pub unique_ips: u32,
}

/// Transaction from the Helius enhanced-transactions endpoint.
/// `timestamp` is epoch seconds, unlike the visitor/wallet events above.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedTransaction {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    #[serde(rename = "accountData")]
    pub account_data: Option<Vec<AccountEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    pub account: String,
}

/// Token balance from the Helius balances endpoint. `amount` is the raw
/// integer amount; `decimals` may be absent for malformed mints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
    pub mint: String,
    pub amount: u64,
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletBalances {
    #[serde(default)]
    pub tokens: Vec<TokenBalance>,
    #[serde(rename = "nativeBalance", default)]
    pub native_balance: u64,
}

/// One logged agent interaction, as stored in the hosted activity list.
/// Field names follow the store's existing JSON contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub timestamp: i64,
    #[serde(rename = "userIP", skip_serializing_if = "Option::is_none")]
    pub user_ip: Option<String>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub category: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(rename = "functionsUsed", default)]
    pub functions_used: Vec<String>,
    #[serde(rename = "conversationLength", default)]
    pub conversation_length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_role_as_str() {
        assert_eq!(WalletRole::Creator.as_str(), "creator");
        assert_eq!(WalletRole::Donations.as_str(), "donations");
        assert_eq!(WalletRole::Token.as_str(), "token");
    }

    #[test]
    fn test_parse_wallet_events_payload() {
        let json = r#"{"recentEvents":[{"walletAddress":"W1","timestamp":1700000000000,"userAgent":"Mozilla/5.0"}],"uniqueWallets":4}"#;
        let payload: WalletEventsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.recent_events.len(), 1);
        assert_eq!(payload.recent_events[0].wallet_address, "W1");
        assert_eq!(payload.unique_wallets, 4);
    }

    #[test]
    fn test_parse_wallet_events_payload_missing_fields() {
        let payload: WalletEventsPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.recent_events.is_empty());
        assert_eq!(payload.unique_wallets, 0);
    }

    #[test]
    fn test_parse_visitors_payload() {
        let json = r#"{"recentVisitors":[{"ip":"1.2.3.4","city":"Austin","country":"US","timezone":"America/Chicago","timestamp":1700000000000,"userAgent":"Mozilla/5.0"}],"uniqueIPs":2}"#;
        let payload: VisitorsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.recent_visitors[0].ip, "1.2.3.4");
        assert_eq!(payload.recent_visitors[0].city.as_deref(), Some("Austin"));
        assert_eq!(payload.unique_ips, 2);
    }

    #[test]
    fn test_parse_visitor_without_geo() {
        let json = r#"{"ip":"1.2.3.4","timestamp":1700000000000}"#;
        let visitor: VisitorRecord = serde_json::from_str(json).unwrap();
        assert!(visitor.city.is_none());
        assert!(visitor.user_agent.is_none());
    }

    #[test]
    fn test_parse_indexed_transaction() {
        let json = r#"{"timestamp":1700000000,"type":"SWAP","accountData":[{"account":"abc"},{"account":"def"}]}"#;
        let tx: IndexedTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.tx_type.as_deref(), Some("SWAP"));
        assert_eq!(tx.account_data.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_transaction_without_type() {
        let json = r#"{"timestamp":1700000000}"#;
        let tx: IndexedTransaction = serde_json::from_str(json).unwrap();
        assert!(tx.tx_type.is_none());
        assert!(tx.account_data.is_none());
    }

    #[test]
    fn test_parse_wallet_balances() {
        let json = r#"{"tokens":[{"mint":"M1","amount":5000000,"decimals":6}],"nativeBalance":2450000000}"#;
        let balances: WalletBalances = serde_json::from_str(json).unwrap();
        assert_eq!(balances.tokens.len(), 1);
        assert_eq!(balances.native_balance, 2_450_000_000);
    }

    #[test]
    fn test_wallet_balances_default_is_empty() {
        let balances: WalletBalances = serde_json::from_str("{}").unwrap();
        assert!(balances.tokens.is_empty());
        assert_eq!(balances.native_balance, 0);
    }

    #[test]
    fn test_activity_entry_round_trip_uses_store_field_names() {
        let entry = ActivityLogEntry {
            timestamp: 1_700_000_000_000,
            user_ip: Some("1.2.3.4".to_string()),
            user_agent: None,
            category: "identity".to_string(),
            query: "who am i".to_string(),
            response: None,
            functions_used: vec!["getUserIdentity".to_string()],
            conversation_length: 2,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"userIP\""));
        assert!(json.contains("\"functionsUsed\""));
        assert!(json.contains("\"conversationLength\""));
        assert!(!json.contains("userAgent"));

        let parsed: ActivityLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.category, "identity");
        assert_eq!(parsed.functions_used, vec!["getUserIdentity"]);
    }
}
