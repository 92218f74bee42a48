//! Fetches the activity log from a running agent and prints daily stats and
//! recent queries. Companion tool for the `/api/activity` endpoint.

use anyhow::{Context, Result};
use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
struct Options {
    url: String,
    token: Option<String>,
    limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: "http://localhost:8887".to_string(),
            token: None,
            limit: 50,
        }
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => {
                options.url = args.next().ok_or("--url requires a value")?;
            }
            "--token" => {
                options.token = Some(args.next().ok_or("--token requires a value")?);
            }
            "--limit" => {
                let raw = args.next().ok_or("--limit requires a value")?;
                options.limit = raw
                    .parse()
                    .map_err(|_| format!("invalid --limit value: {raw}"))?;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = parse_args(std::env::args().skip(1)).map_err(anyhow::Error::msg)?;
    if options.token.is_none() {
        if let Ok(token) = std::env::var("AGENT_ADMIN_TOKEN") {
            return run(Options {
                token: Some(token),
                ..options
            })
            .await;
        }
    }
    run(options).await
}

async fn run(options: Options) -> Result<()> {
    let mut url = format!(
        "{}/api/activity?limit={}",
        options.url.trim_end_matches('/'),
        options.limit
    );
    if let Some(token) = &options.token {
        url.push_str(&format!("&token={token}"));
    }

    println!("Fetching activity from {}", options.url);

    let resp = reqwest::get(&url).await.context("request failed")?;
    match resp.status().as_u16() {
        401 => anyhow::bail!("unauthorized: check the admin token"),
        503 => anyhow::bail!("activity logging is not configured on the agent"),
        status if !(200..300).contains(&status) => anyhow::bail!("agent returned HTTP {status}"),
        _ => {}
    }

    let data: Value = resp.json().await.context("invalid response body")?;
    print_stats(&data);
    print_activities(&data);
    Ok(())
}

fn print_stats(data: &Value) {
    println!("\nDaily statistics");
    println!("{}", "-".repeat(60));

    let Some(stats) = data.get("stats").and_then(Value::as_object) else {
        println!("  no stats recorded yet");
        return;
    };
    if stats.is_empty() {
        println!("  no stats recorded yet");
        return;
    }

    // Newest day first.
    for (date, day) in stats.iter().rev() {
        let queries = day.get("queries").and_then(Value::as_i64).unwrap_or(0);
        println!("\n  {date}: {queries} queries");
        if let Some(day) = day.as_object() {
            for (key, count) in day {
                if let Some(category) = key.strip_prefix("cat:") {
                    println!("    {category}: {count}");
                }
            }
        }
    }
}

fn print_activities(data: &Value) {
    println!("\nRecent queries");
    println!("{}", "-".repeat(60));

    let activities = data
        .get("activities")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if activities.is_empty() {
        println!("  no activity recorded yet");
        return;
    }

    for (index, activity) in activities.iter().enumerate() {
        let query = activity.get("query").and_then(Value::as_str).unwrap_or("N/A");
        let category = activity
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let ip = activity
            .get("userIP")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let timestamp = activity.get("timestamp").and_then(Value::as_i64).unwrap_or(0);

        println!("\n{}. [{timestamp}] {category} from {ip}", index + 1);
        println!("   \"{query}\"");

        if let Some(functions) = activity.get("functionsUsed").and_then(Value::as_array) {
            if !functions.is_empty() {
                let names: Vec<&str> = functions.iter().filter_map(Value::as_str).collect();
                println!("   functions: {}", names.join(", "));
            }
        }
    }

    if let Some(pagination) = data.get("pagination") {
        let total = pagination.get("total").and_then(Value::as_i64).unwrap_or(0);
        println!("\n{}", "-".repeat(60));
        println!("showing {} of {total} entries", activities.len());
    }
}
