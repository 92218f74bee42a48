mod api;
mod llm;
mod metrics;
mod prompt;
mod tools;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use common::activity_log::ActivityLogStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("badseed-agent", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    info!("badseed agent starting");

    metrics::install_prometheus(config.observability.prometheus_port)?;
    metrics::describe();

    let toolbox = tools::Toolbox::from_config(&config);

    let llm = config
        .llm
        .api_key
        .as_deref()
        .map(|key| llm::LlmClient::new(&config.llm, key));
    if llm.is_none() {
        warn!("XAI_API_KEY not set; /api/chat will refuse queries");
    }

    let activity = match (&config.activity_log.url, &config.activity_log.token) {
        (Some(url), Some(token)) => Some(Arc::new(ActivityLogStore::new(
            url,
            token,
            config.activity_log.max_entries,
        ))),
        _ => {
            warn!("activity store not configured; interaction logging disabled");
            None
        }
    };

    let state = Arc::new(api::AppState {
        llm,
        toolbox,
        activity,
        admin_token: config.server.admin_token.clone(),
        max_tool_iterations: config.llm.max_tool_iterations,
        stats_days: config.activity_log.stats_days,
        started_at: chrono::Utc::now(),
    });

    let app = api::router(state);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!(addr = %bind_addr, "starting agent HTTP server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
