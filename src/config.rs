//! Installer settings loaded from `config.toml`, created with defaults on first run

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::install::APPROX_STDOUT_CHARS;

/// Overrides `poll_interval_ms` when set to a whole number of milliseconds
pub const POLL_ENV: &str = "CONDAWIZ_POLL_MS";

/// On-disk installer settings (`config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Directory holding `installer/` with the license and manifest
    pub resources_dir: Option<PathBuf>,
    /// Destination offered before the user picks one
    pub default_target: Option<PathBuf>,
    pub expected_stdout_chars: usize,
    pub poll_interval_ms: u64,
    /// Packages fetched by a bootstrap install
    pub bootstrap_packages: Vec<String>,
    /// Shell the POSIX installer script runs under
    pub posix_shell: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            resources_dir: None,
            default_target: None,
            expected_stdout_chars: APPROX_STDOUT_CHARS,
            poll_interval_ms: 100,
            bootstrap_packages: vec!["anaconda".into()],
            posix_shell: "bash".into(),
        }
    }
}

impl InstallerConfig {
    /// `<config dir>/condawiz/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("condawiz");
        Ok(dir.join("config.toml"))
    }

    /// Load `path`, writing the defaults there first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config not found at {}, creating default configuration", path.display());

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }

            let default_toml =
                toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")?;
            fs::write(path, default_toml).context("Failed to write config file")?;
        }

        let cfg_str = fs::read_to_string(path).context("Failed to read config file")?;
        let cfg: Self = toml::from_str(&cfg_str).context("Failed to parse config")?;
        info!("Using config from: {}", path.display());
        Ok(cfg)
    }

    /// Supervisor poll cadence, honouring [`POLL_ENV`]
    pub fn poll_interval(&self) -> Duration {
        poll_override(std::env::var(POLL_ENV).ok().as_deref())
            .unwrap_or_else(|| Duration::from_millis(self.poll_interval_ms))
    }

    /// Resource root: the configured one, else `resources/` beside the binary
    pub fn resources_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.resources_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let dir = exe
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory"))?;
        Ok(dir.join("resources"))
    }
}

fn poll_override(raw: Option<&str>) -> Option<Duration> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
