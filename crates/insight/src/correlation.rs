use chrono::{SecondsFormat, TimeZone, Utc};
use common::config;
use common::types::{VisitorRecord, WalletEvent};
use serde::Serialize;

const PARTIAL_MESSAGE: &str =
    "Voice Node wallet data available. Value Node visitor tracking pending deployment.";

/// Correlation heuristic thresholds. Built from config or test defaults.
/// The values are a coarse policy inherited from the deployed system, not a
/// statistical model; changing them changes observable behavior.
#[derive(Debug, Clone)]
pub struct CorrelationSettings {
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

impl CorrelationSettings {
    pub fn from_config(c: &config::Correlation) -> Self {
        Self {
            window_ms: c.window_ms,
            tight_window_ms: c.tight_window_ms,
            near_window_ms: c.near_window_ms,
            base_confidence: c.base_confidence,
            tight_bonus: c.tight_bonus,
            near_bonus: c.near_bonus,
            loose_bonus: c.loose_bonus,
            user_agent_bonus: c.user_agent_bonus,
            max_results: c.max_results,
            wallet_only_limit: c.wallet_only_limit,
        }
    }

    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            window_ms: 1_800_000,
            tight_window_ms: 300_000,
            near_window_ms: 900_000,
            base_confidence: 50,
            tight_bonus: 30,
            near_bonus: 20,
            loose_bonus: 10,
            user_agent_bonus: 20,
            max_results: 20,
            wallet_only_limit: 10,
        }
    }
}

/// A hypothesized same-user match between a wallet-connection event and a
/// visitor record. Field names follow the existing node JSON contract.
#[derive(Debug, Clone, Serialize)]
pub struct Correlation {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    pub ip: String,
    pub location: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    #[serde(rename = "timeDifference")]
    pub time_difference: i64,
    pub confidence: u32,
    #[serde(rename = "voiceNodeTime")]
    pub voice_node_time: String,
    #[serde(rename = "valueNodeTime")]
    pub value_node_time: String,
    #[serde(rename = "userAgent")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStatus {
    Full,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub correlations: Vec<Correlation>,
    /// Present only on partial results: the wallet events observed at the
    /// Voice node, passed through so the caller can still report something.
    #[serde(rename = "walletOnly", skip_serializing_if = "Option::is_none")]
    pub wallet_only: Option<Vec<WalletEvent>>,
    #[serde(rename = "totalWallets")]
    pub total_wallets: u32,
    #[serde(rename = "totalVisitors")]
    pub total_visitors: u32,
    #[serde(rename = "matchRate")]
    pub match_rate: f64,
    pub status: CorrelationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Match wallet-connection events against visitor records by timestamp
/// proximity and user-agent equality.
///
/// With no visitor data at all the result is a *partial* report rather than
/// an empty *full* one: callers must be able to tell "one source missing"
/// apart from "no matches found". Both lists are expected to be small
/// (bounded by the upstream trackers' retention), so the cross product is
/// fine.
pub fn correlate(
    events: &[WalletEvent],
    visitors: &[VisitorRecord],
    total_wallets: u32,
    total_visitors: u32,
    settings: &CorrelationSettings,
) -> CorrelationReport {
    if visitors.is_empty() {
        return CorrelationReport {
            correlations: vec![],
            wallet_only: Some(
                events
                    .iter()
                    .take(settings.wallet_only_limit)
                    .cloned()
                    .collect(),
            ),
            total_wallets,
            total_visitors: 0,
            match_rate: 0.0,
            status: CorrelationStatus::Partial,
            message: Some(PARTIAL_MESSAGE.to_string()),
        };
    }

    let mut correlations = Vec::new();
    for event in events {
        for visitor in visitors {
            let time_difference = (event.timestamp - visitor.timestamp).abs();
            if time_difference >= settings.window_ms {
                continue;
            }

            correlations.push(Correlation {
                wallet_address: event.wallet_address.clone(),
                ip: visitor.ip.clone(),
                location: display_location(visitor),
                city: visitor.city.clone(),
                country: visitor.country.clone(),
                timezone: visitor.timezone.clone(),
                time_difference,
                confidence: score_confidence(event, visitor, time_difference, settings),
                voice_node_time: iso_millis(event.timestamp),
                value_node_time: iso_millis(visitor.timestamp),
                user_agent: visitor.user_agent.clone(),
            });
        }
    }

    correlations.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.time_difference.cmp(&b.time_difference))
    });
    correlations.truncate(settings.max_results);

    let match_rate = if correlations.is_empty() {
        0.0
    } else {
        let rate = correlations.len() as f64 / f64::from(total_wallets.max(1)) * 100.0;
        (rate * 10.0).round() / 10.0
    };

    CorrelationReport {
        correlations,
        wallet_only: None,
        total_wallets,
        total_visitors,
        match_rate,
        status: CorrelationStatus::Full,
        message: None,
    }
}

fn score_confidence(
    event: &WalletEvent,
    visitor: &VisitorRecord,
    time_difference: i64,
    settings: &CorrelationSettings,
) -> u32 {
    let mut confidence = settings.base_confidence;

    confidence += if time_difference < settings.tight_window_ms {
        settings.tight_bonus
    } else if time_difference < settings.near_window_ms {
        settings.near_bonus
    } else {
        settings.loose_bonus
    };

    if let (Some(a), Some(b)) = (&event.user_agent, &visitor.user_agent) {
        if !a.is_empty() && a == b {
            confidence += settings.user_agent_bonus;
        }
    }

    confidence.min(100)
}

fn display_location(visitor: &VisitorRecord) -> String {
    format!(
        "{}, {}",
        visitor.city.as_deref().unwrap_or("Unknown"),
        visitor.country.as_deref().unwrap_or("Unknown")
    )
}

fn iso_millis(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "1970-01-01T00:00:00.000Z".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(wallet: &str, timestamp: i64, user_agent: Option<&str>) -> WalletEvent {
        WalletEvent {
            wallet_address: wallet.to_string(),
            timestamp,
            user_agent: user_agent.map(str::to_string),
        }
    }

    fn visitor(ip: &str, timestamp: i64, user_agent: Option<&str>) -> VisitorRecord {
        VisitorRecord {
            ip: ip.to_string(),
            city: Some("Austin".to_string()),
            country: Some("US".to_string()),
            timezone: Some("America/Chicago".to_string()),
            timestamp,
            user_agent: user_agent.map(str::to_string),
        }
    }

    #[test]
    fn test_pairs_outside_window_are_dropped() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 1_000_000, None)],
            &[visitor("1.2.3.4", 1_000_000 + 1_800_000, None)],
            1,
            1,
            &settings,
        );
        assert_eq!(report.status, CorrelationStatus::Full);
        assert!(report.correlations.is_empty());
        assert!(report.match_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_pair_just_inside_window_scores_loose_tier() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 1_000_000, None)],
            &[visitor("1.2.3.4", 1_000_000 + 1_799_999, None)],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations.len(), 1);
        assert_eq!(report.correlations[0].confidence, 60);
    }

    #[test]
    fn test_tight_tier_confidence() {
        let settings = CorrelationSettings::default_for_test();
        // Under 5 minutes, no user agents: 50 + 30 = 80.
        let report = correlate(
            &[event("W1", 1_000_000, None)],
            &[visitor("1.2.3.4", 1_000_000 + 299_999, None)],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 80);
    }

    #[test]
    fn test_tight_tier_with_matching_user_agent_hits_cap() {
        let settings = CorrelationSettings::default_for_test();
        // 50 + 30 + 20 = 100, clamped at 100.
        let report = correlate(
            &[event("W1", 1_000_000, Some("A"))],
            &[visitor("1.2.3.4", 1_000_000 + 200_000, Some("A"))],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 100);
        assert_eq!(report.correlations[0].time_difference, 200_000);
    }

    #[test]
    fn test_near_tier_boundaries() {
        let settings = CorrelationSettings::default_for_test();
        // Exactly 5 minutes is no longer the tight tier: 50 + 20 = 70.
        let at_five = correlate(
            &[event("W1", 0, None)],
            &[visitor("1.2.3.4", 300_000, None)],
            1,
            1,
            &settings,
        );
        assert_eq!(at_five.correlations[0].confidence, 70);

        let with_ua = correlate(
            &[event("W1", 0, Some("A"))],
            &[visitor("1.2.3.4", 300_000, Some("A"))],
            1,
            1,
            &settings,
        );
        assert_eq!(with_ua.correlations[0].confidence, 90);
    }

    #[test]
    fn test_loose_tier_boundaries() {
        let settings = CorrelationSettings::default_for_test();
        // Exactly 15 minutes drops to the loose tier: 50 + 10 = 60.
        let report = correlate(
            &[event("W1", 0, None)],
            &[visitor("1.2.3.4", 900_000, None)],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 60);

        let with_ua = correlate(
            &[event("W1", 0, Some("A"))],
            &[visitor("1.2.3.4", 900_000, Some("A"))],
            1,
            1,
            &settings,
        );
        assert_eq!(with_ua.correlations[0].confidence, 80);
    }

    #[test]
    fn test_user_agent_mismatch_gets_no_bonus() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, Some("A"))],
            &[visitor("1.2.3.4", 100_000, Some("B"))],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 80);
    }

    #[test]
    fn test_user_agent_comparison_is_case_sensitive() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, Some("Mozilla"))],
            &[visitor("1.2.3.4", 100_000, Some("mozilla"))],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 80);
    }

    #[test]
    fn test_empty_user_agents_get_no_bonus() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, Some(""))],
            &[visitor("1.2.3.4", 100_000, Some(""))],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations[0].confidence, 80);
    }

    #[test]
    fn test_sorted_by_confidence_then_time_difference() {
        let settings = CorrelationSettings::default_for_test();
        let events = vec![
            event("W1", 0, Some("A")),
            event("W2", 0, None),
            event("W3", 0, Some("A")),
        ];
        // W1: tight + UA = 100 at 100_000; W2: tight no UA = 80 at 50_000;
        // W3: tight + UA = 100 at 100_000 via the same visitor... use two
        // visitors to vary time differences.
        let visitors = vec![
            visitor("1.1.1.1", 100_000, Some("A")),
            visitor("2.2.2.2", 50_000, None),
        ];
        let report = correlate(&events, &visitors, 3, 2, &settings);

        let scores: Vec<(u32, i64)> = report
            .correlations
            .iter()
            .map(|c| (c.confidence, c.time_difference))
            .collect();
        for pair in scores.windows(2) {
            let (c0, t0) = pair[0];
            let (c1, t1) = pair[1];
            assert!(c0 > c1 || (c0 == c1 && t0 <= t1), "bad order: {scores:?}");
        }
    }

    #[test]
    fn test_output_truncated_to_max_results() {
        let settings = CorrelationSettings::default_for_test();
        let events: Vec<WalletEvent> = (0..6).map(|i| event(&format!("W{i}"), 0, None)).collect();
        let visitors: Vec<VisitorRecord> = (0..5)
            .map(|i| visitor(&format!("10.0.0.{i}"), 1_000, None))
            .collect();
        // 30 candidate pairs, all in-window.
        let report = correlate(&events, &visitors, 6, 5, &settings);
        assert_eq!(report.correlations.len(), 20);
    }

    #[test]
    fn test_empty_visitors_returns_partial() {
        let settings = CorrelationSettings::default_for_test();
        let events: Vec<WalletEvent> = (0..12).map(|i| event(&format!("W{i}"), 0, None)).collect();
        let report = correlate(&events, &[], 12, 0, &settings);

        assert_eq!(report.status, CorrelationStatus::Partial);
        assert!(report.correlations.is_empty());
        assert_eq!(report.wallet_only.as_ref().unwrap().len(), 10);
        assert_eq!(report.total_wallets, 12);
        assert_eq!(report.total_visitors, 0);
        assert!(report.match_rate.abs() < f64::EPSILON);
        assert!(report.message.is_some());
    }

    #[test]
    fn test_empty_events_with_visitors_is_full_not_partial() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(&[], &[visitor("1.2.3.4", 0, None)], 0, 1, &settings);
        assert_eq!(report.status, CorrelationStatus::Full);
        assert!(report.correlations.is_empty());
        assert!(report.wallet_only.is_none());
    }

    #[test]
    fn test_match_rate_rounds_to_one_decimal() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, None)],
            &[visitor("1.2.3.4", 1_000, None)],
            3,
            1,
            &settings,
        );
        // 1/3 * 100 = 33.333... -> 33.3
        assert!((report.match_rate - 33.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_match_rate_guards_zero_wallets() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, None)],
            &[visitor("1.2.3.4", 1_000, None)],
            0,
            1,
            &settings,
        );
        // Denominator clamps to 1: 1/1 * 100 = 100.0
        assert!((report.match_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_austin_scenario() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 1_000_000, Some("A"))],
            &[visitor("1.2.3.4", 1_200_000, Some("A"))],
            1,
            1,
            &settings,
        );
        assert_eq!(report.correlations.len(), 1);
        let c = &report.correlations[0];
        assert_eq!(c.confidence, 100);
        assert_eq!(c.time_difference, 200_000);
        assert_eq!(c.location, "Austin, US");
        assert_eq!(c.wallet_address, "W1");
        assert_eq!(c.ip, "1.2.3.4");
    }

    #[test]
    fn test_node_times_are_iso_with_millis() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 1_700_000_000_123, None)],
            &[visitor("1.2.3.4", 1_700_000_000_456, None)],
            1,
            1,
            &settings,
        );
        let c = &report.correlations[0];
        assert_eq!(c.voice_node_time, "2023-11-14T22:13:20.123Z");
        assert_eq!(c.value_node_time, "2023-11-14T22:13:20.456Z");
    }

    #[test]
    fn test_missing_geo_renders_unknown_location() {
        let settings = CorrelationSettings::default_for_test();
        let anonymous = VisitorRecord {
            ip: "1.2.3.4".to_string(),
            city: None,
            country: None,
            timezone: None,
            timestamp: 1_000,
            user_agent: None,
        };
        let report = correlate(&[event("W1", 0, None)], &[anonymous], 1, 1, &settings);
        assert_eq!(report.correlations[0].location, "Unknown, Unknown");
    }

    #[test]
    fn test_idempotent_for_identical_inputs() {
        let settings = CorrelationSettings::default_for_test();
        let events = vec![event("W1", 0, Some("A")), event("W2", 120_000, None)];
        let visitors = vec![
            visitor("1.1.1.1", 60_000, Some("A")),
            visitor("2.2.2.2", 400_000, None),
        ];
        let first = serde_json::to_string(&correlate(&events, &visitors, 2, 2, &settings)).unwrap();
        let second =
            serde_json::to_string(&correlate(&events, &visitors, 2, 2, &settings)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_serializes_with_node_contract_field_names() {
        let settings = CorrelationSettings::default_for_test();
        let report = correlate(
            &[event("W1", 0, Some("A"))],
            &[visitor("1.2.3.4", 1_000, Some("A"))],
            1,
            1,
            &settings,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "full");
        assert_eq!(json["totalWallets"], 1);
        assert_eq!(json["correlations"][0]["walletAddress"], "W1");
        assert_eq!(json["correlations"][0]["timeDifference"], 1_000);
        assert!(json.get("walletOnly").is_none());
    }
}
