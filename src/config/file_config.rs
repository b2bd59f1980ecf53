use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub input: Option<String>,
    /// Human readable duration, e.g. "60s" or "1m 30s".
    pub interval: Option<String>,
    pub workers: Option<usize>,
    pub alert_threshold: Option<i64>,
    pub request_timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
