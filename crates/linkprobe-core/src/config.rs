use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::artifact::{ArtifactMatcher, DEFAULT_KIND_PARAM, DEFAULT_MARKER};
use crate::playlist::DEFAULT_MAX_BATCH;
use crate::session::ReconnectPolicy;

/// Reconnect parameters (`[reconnect]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before reconnecting while the retry budget lasts.
    pub base_delay_ms: u64,
    /// Failed connection attempts before the delay starts doubling.
    pub retry_budget: i64,
    /// Liveness check period while connected.
    pub watchdog_interval_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            base_delay_ms: policy.base_delay.as_millis() as u64,
            retry_budget: policy.retry_budget,
            watchdog_interval_ms: policy.watchdog_interval.as_millis() as u64,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms.max(1)),
            retry_budget: self.retry_budget,
            watchdog_interval: Duration::from_millis(self.watchdog_interval_ms.max(1)),
        }
    }
}

/// Probe traffic filtering (`[probe]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// `key=value` pair every interesting media request carries.
    pub marker: String,
    /// Query key holding the kind tag (`audio/...`, `video/...`).
    pub kind_param: String,
    /// Only requests to hosts ending in this suffix are reported.
    pub host_suffix: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            kind_param: DEFAULT_KIND_PARAM.to_string(),
            host_suffix: "googlevideo.com".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn matcher(&self) -> ArtifactMatcher {
        ArtifactMatcher::new(&self.marker, &self.kind_param)
    }
}

/// Browser host settings (`[browser]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Explicit Chromium binary; autodetected when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    /// DOM polls before a playlist expansion is declared failed.
    pub expand_attempts: u32,
    /// Delay between DOM polls.
    pub expand_poll_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromium_path: None,
            headless: true,
            expand_attempts: 10,
            expand_poll_ms: 1000,
        }
    }
}

/// Global configuration loaded from `~/.config/linkprobe/config.toml`.
///
/// Every key is optional; missing keys take their built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkprobeConfig {
    /// Controller WebSocket endpoint.
    pub controller_url: String,
    /// In-flight task cap for the active playlist.
    pub max_batch: usize,
    pub reconnect: ReconnectConfig,
    pub probe: ProbeConfig,
    pub browser: BrowserConfig,
}

impl Default for LinkprobeConfig {
    fn default() -> Self {
        Self {
            controller_url: "ws://127.0.0.1:5558".to_string(),
            max_batch: DEFAULT_MAX_BATCH,
            reconnect: ReconnectConfig::default(),
            probe: ProbeConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl LinkprobeConfig {
    /// Clamp values that would stall the engine or spin the event loop.
    pub fn normalized(mut self) -> Self {
        self.max_batch = self.max_batch.max(1);
        self.reconnect.base_delay_ms = self.reconnect.base_delay_ms.max(1);
        self.reconnect.watchdog_interval_ms = self.reconnect.watchdog_interval_ms.max(1);
        self.browser.expand_attempts = self.browser.expand_attempts.max(1);
        self
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("linkprobe")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LinkprobeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LinkprobeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from(path: &Path) -> Result<LinkprobeConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: LinkprobeConfig = toml::from_str(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg.normalized())
}
