//! Process entry point: loads [`Config`] from the environment, wires up
//! the JSON-lines sink and the Prometheus exporter, and runs the TCP
//! accept loop until the process receives a shutdown signal.

use std::sync::Arc;

use galileosky_core::Config;
use galileosky_metrics::MercuryMetrics;
use galileosky_network::Server;
use galileosky_sink::JsonlSink;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.debug);

    tracing::info!(
        host = %config.host,
        port = config.port,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        sink_path = %config.sink_path.display(),
        "starting galileosky ingestion server"
    );

    if let Err(err) = galileosky_metrics::install_exporter() {
        tracing::warn!(error = %err, "failed to install prometheus exporter, continuing without metrics");
    }

    let sink = Arc::new(JsonlSink::new(&config.sink_path));
    let metrics = Arc::new(MercuryMetrics::new());

    let server = Server::bind(
        config.bind_addr().parse()?,
        sink,
        Some(metrics),
        config.idle_timeout,
    )
    .await?;

    tokio::select! {
        _ = server.serve() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

/// `DEBUG=true` (the default) drops the log level to `debug`; otherwise
/// only `info` and above are emitted. Either way `RUST_LOG` overrides
/// this if set, same as every other crate in this workspace that uses
/// `tracing-subscriber`.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
