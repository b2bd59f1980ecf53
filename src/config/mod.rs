mod file_config;

pub use file_config::FileConfig;

use crate::worker::{WorkerSettings, DEFAULT_ALERT_THRESHOLD, MIN_INTERVAL};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_INTERVAL: &str = "60s";
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_url: Option<String>,
    pub input: Option<String>,
    pub interval: String,
    pub workers: usize,
    pub alert_threshold: i64,
    pub request_timeout_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            input: None,
            interval: DEFAULT_INTERVAL.to_string(),
            workers: DEFAULT_WORKERS,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub input: String,
    pub interval: Duration,
    pub workers: usize,
    pub alert_threshold: i64,
    pub request_timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let input = file
            .input
            .or_else(|| cli.input.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("no input specified"))?;

        let api_url = file
            .api_url
            .or_else(|| cli.api_url.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("no API URL specified"))?;
        validate_api_url(&api_url)?;

        let interval_text = file.interval.unwrap_or_else(|| cli.interval.clone());
        let interval = parse_interval(&interval_text)?;
        if interval < MIN_INTERVAL {
            bail!("interval should be at least a second");
        }

        let workers = file.workers.unwrap_or(cli.workers);
        if workers < 1 {
            bail!("workers count should be greater than zero");
        }

        let alert_threshold = file.alert_threshold.unwrap_or(cli.alert_threshold);

        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request timeout should be greater than zero");
        }

        Ok(Self {
            api_url,
            input,
            interval,
            workers,
            alert_threshold,
            request_timeout_sec,
        })
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            interval: self.interval,
            concurrency: self.workers,
            alert_threshold: self.alert_threshold,
        }
    }
}

fn validate_api_url(api_url: &str) -> Result<()> {
    let url = Url::parse(api_url).with_context(|| format!("API URL parse error: {}", api_url))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        bail!("invalid API URL: {}", api_url);
    }
    Ok(())
}

/// Parses durations like "60s", "1m 30s" or "500ms".
pub fn parse_interval(s: &str) -> Result<Duration> {
    humantime::parse_duration(s.trim()).with_context(|| format!("invalid interval {:?}", s))
}
