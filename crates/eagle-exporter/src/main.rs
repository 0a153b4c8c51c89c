//! eagle-exporter - Prometheus exporter for Rainforest Eagle energy monitors
//!
//! Polls one Eagle and serves its demand and summation readings on
//! `/metrics` until interrupted.

use std::path::PathBuf;

use clap::Parser;
use eagle_exporter::{DeviceClient, ExporterConfig, MetricsServer, PollLoop};
use eagle_metrics::MetricsRegistry;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "eagle-exporter")]
#[command(about = "Export Rainforest Eagle energy readings as Prometheus metrics")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file; flags override its values
    #[arg(short, long, env = "EAGLE_CONFIG")]
    config: Option<PathBuf>,

    /// Eagle host, host:port, or base URL
    #[arg(short = 'e', long, alias = "eagle_host", env = "EAGLE_HOST")]
    eagle_host: Option<String>,

    /// Username (cloud id)
    #[arg(short, long, env = "EAGLE_USER")]
    user: Option<String>,

    /// Password (install code)
    #[arg(short, long, env = "EAGLE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Meter MAC id
    #[arg(short, long, env = "EAGLE_MAC")]
    mac: Option<String>,

    /// Port for the metrics endpoint [default: 8002]
    #[arg(long, env = "EAGLE_PORT")]
    port: Option<u16>,

    /// Seconds to sleep between polls [default: 5]
    #[arg(long, env = "EAGLE_SLEEP")]
    sleep: Option<u64>,

    /// Seconds without a good reading before metrics are removed [default: 300]
    #[arg(long, env = "EAGLE_TTL")]
    ttl: Option<u64>,

    /// Device request timeout in seconds [default: 10]
    #[arg(long, env = "EAGLE_TIMEOUT")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Builds the effective configuration: file (or defaults), then flags.
    fn into_config(self) -> anyhow::Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::from_file(path)?,
            None => ExporterConfig::default(),
        };

        if let Some(host) = self.eagle_host {
            config.eagle_host = host;
        }
        if let Some(user) = self.user {
            config.credentials.user = user;
        }
        if let Some(password) = self.password {
            config.credentials.password = password;
        }
        if let Some(mac) = self.mac {
            config.credentials.mac = mac;
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(sleep) = self.sleep {
            config.poll_interval_secs = sleep;
        }
        if let Some(ttl) = self.ttl {
            config.metric_ttl_secs = ttl;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        config.verbose |= self.verbose;

        config.validate()?;
        Ok(config)
    }
}

/// `RUST_LOG` when set, otherwise both crates at `info` (`debug` if verbose).
fn env_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            let level = if verbose { "debug" } else { "info" };
            EnvFilter::new(format!("eagle_exporter={level},eagle_metrics={level}"))
        })
}

fn init_tracing(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter(rust_log.as_deref(), verbose))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_tracing(config.verbose);

    info!(
        eagle_host = %config.eagle_host,
        listen = %config.bind_addr(),
        poll_interval_secs = config.poll_interval_secs,
        metric_ttl_secs = config.metric_ttl_secs,
        "starting eagle-exporter"
    );

    let registry = MetricsRegistry::new();
    let listener = MetricsServer::bind(config.bind_addr()).await?;
    let server = MetricsServer::new(registry.clone());

    let client = DeviceClient::from_config(&config)?;
    let mut poll = PollLoop::new(
        client,
        &registry,
        config.metric_ttl(),
        config.poll_interval(),
    );

    tokio::select! {
        result = server.serve(listener) => result?,
        () = poll.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("interrupted, shutting down");
        }
    }

    Ok(())
}
