use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coalescer::{CoalescerSettings, DEFAULT_BUFFER_SIZE, DEFAULT_IDLE_TIMEOUT};
use crate::navigate::normalize_target;

/// Mutation observer parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Notifications that force an immediate flush.
    pub buffer_size: usize,
    /// Idle window in milliseconds after which a partial batch is flushed.
    pub idle_timeout_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl From<&ObserverConfig> for CoalescerSettings {
    fn from(cfg: &ObserverConfig) -> Self {
        CoalescerSettings {
            buffer_size: cfg.buffer_size,
            idle_timeout: Duration::from_millis(cfg.idle_timeout_ms),
        }
    }
}

/// Global configuration loaded from `~/.config/wpx/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpxConfig {
    /// `host[:port]` the proxy is served from; used as the proxy origin.
    pub proxy_host: String,
    /// Origin that relative URLs resolve against (`host[:port]`).
    #[serde(default)]
    pub target_domain: Option<String>,
    /// Full external target URL the proxy was opened with. Its host is used
    /// when `target_domain` is not set.
    #[serde(default)]
    pub full_target: Option<String>,
    #[serde(default)]
    pub observer: ObserverConfig,
}

impl Default for WpxConfig {
    fn default() -> Self {
        Self {
            proxy_host: "127.0.0.1:3000".to_string(),
            target_domain: None,
            full_target: None,
            observer: ObserverConfig::default(),
        }
    }
}

impl WpxConfig {
    /// Effective target origin: `target_domain`, else the authority of `full_target`.
    pub fn target_origin(&self) -> Option<String> {
        if let Some(domain) = self.target_domain.as_deref().filter(|d| !d.trim().is_empty()) {
            return Some(domain.trim().to_string());
        }
        let full = normalize_target(self.full_target.as_deref()?).ok()?;
        let host = full.host_str()?;
        Some(match full.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    pub fn coalescer_settings(&self) -> CoalescerSettings {
        CoalescerSettings::from(&self.observer)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wpx")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WpxConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<WpxConfig> {
    if !path.exists() {
        let default_cfg = WpxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WpxConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
