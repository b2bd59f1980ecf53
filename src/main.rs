use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stock_watcher::config::{
    self, DEFAULT_INTERVAL, DEFAULT_REQUEST_TIMEOUT_SEC, DEFAULT_WORKERS,
};
use stock_watcher::source::{self, STDIN_MARKER};
use stock_watcher::worker::{Worker, DEFAULT_ALERT_THRESHOLD};
use stock_watcher::HttpStockClient;

#[derive(Parser, Debug)]
#[clap(about = "Periodically checks item stock and raises low-stock alerts")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the stock API.
    #[clap(long = "api")]
    pub api_url: Option<String>,

    /// Identifier source: a file path (optionally .gz or .bz2), an http(s) URL,
    /// or "--" for standard input.
    #[clap(long)]
    pub input: Option<String>,

    /// Interval between checks, e.g. "60s" or "1m 30s".
    #[clap(long, default_value = DEFAULT_INTERVAL)]
    pub interval: String,

    /// Number of parallel API requests.
    #[clap(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Quantity below which a low-stock alert is sent.
    #[clap(long, default_value_t = DEFAULT_ALERT_THRESHOLD)]
    pub alert_threshold: i64,

    /// Timeout in seconds for each API request.
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SEC)]
    pub request_timeout_sec: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        // A bare trailing "--" selects standard input
        let input = args.input.clone().or_else(|| {
            std::env::args()
                .last()
                .filter(|last| last == STDIN_MARKER)
        });
        config::CliConfig {
            api_url: args.api_url.clone(),
            input,
            interval: args.interval.clone(),
            workers: args.workers,
            alert_threshold: args.alert_threshold,
            request_timeout_sec: args.request_timeout_sec,
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to listen for SIGTERM: {}", e);
            wait_for_ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = wait_for_ctrl_c() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    wait_for_ctrl_c().await;
    "Ctrl+C"
}

/// Resolves on Ctrl+C. If the handler cannot be installed it never resolves,
/// so the process keeps running instead of shutting down at once.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  api_url: {}", app_config.api_url);
    info!("  input: {}", app_config.input);
    info!("  interval: {:?}", app_config.interval);
    info!("  workers: {}", app_config.workers);
    info!("  alert_threshold: {}", app_config.alert_threshold);

    let client = HttpStockClient::new(&app_config.api_url, app_config.request_timeout_sec)
        .context("Failed to create stock API client")?;
    let worker = Arc::new(Worker::new(
        Arc::new(client),
        app_config.worker_settings(),
    ));

    // Read input data
    let loader = Arc::clone(&worker);
    let input = app_config.input.clone();
    let report = tokio::task::spawn_blocking(move || {
        source::read_any(&input, |reader| loader.load_ids(reader))
    })
    .await?
    .context("Error reading source")?;
    info!(
        "Loaded {} identifier(s), skipped {} in {:?}",
        report.loaded, report.skipped, report.elapsed
    );

    // Start the worker
    let runner = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.run().await })
    };

    let signal = shutdown_signal().await;
    info!("Got {}, initiating shutdown...", signal);
    worker.shutdown().await;
    runner.await??;

    info!("Worker exited");
    Ok(())
}
