use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0";

/// Global configuration loaded from `~/.config/zic/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZicConfig {
    /// Simultaneous transfers per album (worker pool size). Keep small: the
    /// catalog sites throttle aggressive clients.
    pub connections: usize,
    /// Connect timeout and stall timeout for HTTP transfers, in seconds.
    pub timeout_secs: u64,
    /// Lower bound of the random pause between retries, in seconds.
    pub min_retry_delay_secs: u64,
    /// Upper bound of the random pause between retries, in seconds.
    pub max_retry_delay_secs: u64,
    /// Files at or below this size are treated as error/rate-limit pages, not tracks.
    pub min_page_size: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Literal file name used for album covers.
    pub cover_name: String,
    /// Prefix album directories with the catalog's numeric album id.
    #[serde(default)]
    pub with_album_id: bool,
    /// Optional SOCKS5 proxy as `host:port` (DNS is resolved through the proxy).
    #[serde(default)]
    pub socks_proxy: Option<String>,
    /// Optional ceiling on whole-file attempts per track. None = retry until interrupted.
    #[serde(default)]
    pub file_attempt_limit: Option<u32>,
}

impl Default for ZicConfig {
    fn default() -> Self {
        Self {
            connections: 3,
            timeout_secs: 10,
            min_retry_delay_secs: 5,
            max_retry_delay_secs: 10,
            min_page_size: 8192,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cover_name: "cover.jpg".to_string(),
            with_album_id: false,
            socks_proxy: None,
            file_attempt_limit: None,
        }
    }
}

/// Values given on the command line; each `Some` replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub connections: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub socks_proxy: Option<String>,
    pub with_album_id: bool,
    pub file_attempt_limit: Option<u32>,
}

impl ZicConfig {
    pub fn apply_overrides(&mut self, o: &ConfigOverrides) {
        if let Some(n) = o.connections {
            self.connections = n;
        }
        if let Some(t) = o.timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(ref p) = o.socks_proxy {
            self.socks_proxy = Some(p.clone());
        }
        if o.with_album_id {
            self.with_album_id = true;
        }
        if let Some(n) = o.file_attempt_limit {
            self.file_attempt_limit = Some(n);
        }
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connections == 0 {
            anyhow::bail!("connections must be at least 1");
        }
        if self.min_retry_delay_secs > self.max_retry_delay_secs {
            anyhow::bail!(
                "min_retry_delay_secs ({}) exceeds max_retry_delay_secs ({})",
                self.min_retry_delay_secs,
                self.max_retry_delay_secs
            );
        }
        if let Some(ref proxy) = self.socks_proxy {
            let port_ok = proxy
                .rsplit_once(':')
                .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !port_ok {
                anyhow::bail!("socks proxy must be \"address:port\", got {:?}", proxy);
            }
        }
        if self.file_attempt_limit == Some(0) {
            anyhow::bail!("file_attempt_limit must be at least 1 when set");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Randomized-delay policy shared by the transport retry loop and the song driver.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            min_delay: Duration::from_secs(self.min_retry_delay_secs),
            max_delay: Duration::from_secs(self.max_retry_delay_secs),
            max_attempts: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("zic")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ZicConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ZicConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ZicConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: ZicConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
