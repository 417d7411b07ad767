use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and register all application metrics.
/// With a listen address the exporter serves the scrape endpoint itself;
/// without one, metrics are recorded but not exported.
pub fn init_metrics(listen_addr: Option<&str>) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new();
    match listen_addr {
        Some(addr) => {
            let addr: SocketAddr = addr.parse()?;
            builder.with_http_listener(addr).install()?;
            tracing::info!(%addr, "Prometheus exporter listening");
        }
        None => {
            let _handle = builder.install_recorder()?;
        }
    }

    // Pre-register counters so they appear even before the first increment.
    counter!("trade_events_total").absolute(0);
    counter!("signals_emitted_total").absolute(0);
    counter!("signals_rejected_total").absolute(0);
    counter!("checkpoints_resolved_total").absolute(0);
    counter!("signals_expired_total").absolute(0);

    gauge!("active_signals").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("pipeline_latency_seconds").record(0.0);

    Ok(())
}
