use anyhow::Result;
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!("agent_queries_total", "Number of chat queries handled.");
    describe_counter!(
        "agent_tool_calls_total",
        "Number of tool invocations requested by the model, labeled by tool."
    );
    describe_counter!(
        "agent_llm_requests_total",
        "Number of chat-completion API requests made."
    );
    describe_counter!(
        "agent_activity_log_failures_total",
        "Number of activity-log writes that failed."
    );
    describe_counter!(
        "tracing_error_events",
        "Number of ERROR-level tracing events."
    );
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_handle_renders_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, || {
            describe();
            ::metrics::counter!("agent_queries_total").increment(1);
        });
        let rendered = handle.render();
        assert!(rendered.contains("agent_queries_total"));
    }
}
