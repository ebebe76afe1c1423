use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::errors::ServiceError;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder backing the `metrics` macros.
/// Safe to call more than once; only the first call installs.
pub fn init_metrics() -> Result<(), ServiceError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        ServiceError::ConfigurationError(format!("failed to install metrics recorder: {e}"))
    })?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Renders the current metrics in Prometheus text format.
pub fn render() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# metrics recorder not initialized\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::counter;

    #[test]
    fn recorder_captures_counters_after_init() {
        init_metrics().expect("recorder install failed");
        // second init is a no-op, not an error
        init_metrics().expect("repeated init failed");

        counter!("msp_test_events", 3, "kind" => "unit".to_string());
        let rendered = render();
        assert!(rendered.contains("msp_test_events"));
    }
}
