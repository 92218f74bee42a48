use crate::types::ActivityLogEntry;
use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

const ACTIVITY_KEY: &str = "badseed:agent:activity";
const STATS_KEY_PREFIX: &str = "badseed:agent:stats";

/// Client for the hosted REST key-value store holding the activity log.
///
/// The store speaks the Upstash command protocol: each request POSTs a JSON
/// array command to the base URL and gets `{"result": ...}` back. Writes are
/// best effort; callers log failures instead of propagating them.
pub struct ActivityLogStore {
    url: String,
    token: String,
    max_entries: usize,
    client: reqwest::Client,
}

impl ActivityLogStore {
    pub fn new(url: &str, token: &str, max_entries: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_entries,
            client,
        }
    }

    async fn command(&self, parts: &[&str]) -> Result<serde_json::Value> {
        let body = encode_command(parts);
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("activity store command {} failed", parts[0]))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("activity store returned {status} for {}", parts[0]);
        }

        let reply: serde_json::Value = resp.json().await.context("invalid store reply")?;
        Ok(reply.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Append one interaction and bump the per-day counters. The list is
    /// trimmed to the most recent `max_entries`.
    pub async fn record(&self, entry: &ActivityLogEntry) -> Result<()> {
        let payload = serde_json::to_string(entry)?;
        self.command(&["LPUSH", ACTIVITY_KEY, payload.as_str()]).await?;

        let last = (self.max_entries.saturating_sub(1)).to_string();
        self.command(&["LTRIM", ACTIVITY_KEY, "0", last.as_str()]).await?;

        let stats_key = stats_key(&day_key(entry.timestamp));
        self.command(&["HINCRBY", stats_key.as_str(), "queries", "1"])
            .await?;

        if !entry.category.is_empty() {
            let field = format!("cat:{}", entry.category);
            self.command(&["HINCRBY", stats_key.as_str(), field.as_str(), "1"]).await?;
        }

        Ok(())
    }

    /// Most-recent-first page of the activity list. Entries that fail to
    /// parse are skipped rather than failing the whole page.
    pub async fn recent(&self, offset: usize, limit: usize) -> Result<Vec<ActivityLogEntry>> {
        let start = offset.to_string();
        let stop = (offset + limit.saturating_sub(1)).to_string();
        let result = self.command(&["LRANGE", ACTIVITY_KEY, start.as_str(), stop.as_str()]).await?;

        let raw: Vec<String> = serde_json::from_value(result).unwrap_or_default();
        let mut entries = Vec::with_capacity(raw.len());
        let mut skipped = 0usize;
        for item in raw {
            match serde_json::from_str(&item) {
                Ok(entry) => entries.push(entry),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped = skipped, "skipped unparseable activity entries");
        }
        Ok(entries)
    }

    pub async fn total(&self) -> Result<u64> {
        let result = self.command(&["LLEN", ACTIVITY_KEY]).await?;
        Ok(result.as_u64().unwrap_or(0))
    }

    /// Counters for one calendar day, decoded from the flat HGETALL reply.
    pub async fn day_stats(&self, date: &str) -> Result<BTreeMap<String, i64>> {
        let key = stats_key(date);
        let result = self.command(&["HGETALL", key.as_str()]).await?;
        Ok(decode_hgetall(&result))
    }

    /// Per-day counters for `today` and the preceding `days - 1` dates.
    /// Days with no recorded queries are omitted.
    pub async fn stats_for_last_days(
        &self,
        today: NaiveDate,
        days: u32,
    ) -> Result<BTreeMap<String, BTreeMap<String, i64>>> {
        let mut stats = BTreeMap::new();
        for offset in 0..i64::from(days) {
            let date = today - chrono::Duration::days(offset);
            let date_str = date.format("%Y-%m-%d").to_string();
            let day = self.day_stats(&date_str).await?;
            if !day.is_empty() {
                stats.insert(date_str, day);
            }
        }
        Ok(stats)
    }
}

fn encode_command(parts: &[&str]) -> serde_json::Value {
    serde_json::Value::Array(
        parts
            .iter()
            .map(|p| serde_json::Value::String((*p).to_string()))
            .collect(),
    )
}

fn stats_key(date: &str) -> String {
    format!("{STATS_KEY_PREFIX}:{date}")
}

/// Calendar date (UTC) for an epoch-millisecond timestamp.
pub fn day_key(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "1970-01-01".to_string(),
    }
}

/// HGETALL replies arrive as a flat `[field, value, field, value, ...]`
/// array; values are counter strings.
fn decode_hgetall(result: &serde_json::Value) -> BTreeMap<String, i64> {
    let mut map = BTreeMap::new();
    let Some(items) = result.as_array() else {
        return map;
    };
    for pair in items.chunks(2) {
        let [field, value] = pair else { continue };
        let Some(field) = field.as_str() else {
            continue;
        };
        let count = match value {
            serde_json::Value::String(s) => s.parse().unwrap_or(0),
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
            _ => 0,
        };
        map.insert(field.to_string(), count);
    }
    map
}
