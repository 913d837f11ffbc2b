use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use eyre::{Result, WrapErr};
use log::LevelFilter;
use serde::Deserialize;

use crate::usage::{SamplerSettings, DEFAULT_FRAME_BUDGET, DEFAULT_WINDOW};

pub const CONFIG_ENV: &str = "DOCKHAND_CONFIG";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "dockhand.log";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine_binary: String,
    pub tick_rate_ms: u64,
    pub sample_interval_ms: u64,
    pub usage_window: usize,
    /// `None` keeps sampling until the usage view is closed.
    pub usage_frame_budget: Option<u64>,
    pub log_follow_interval_ms: u64,
    pub terminals: Vec<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_binary: "docker".to_string(),
            tick_rate_ms: 200,
            sample_interval_ms: 1000,
            usage_window: DEFAULT_WINDOW,
            usage_frame_budget: Some(DEFAULT_FRAME_BUDGET),
            log_follow_interval_ms: 1000,
            terminals: vec![
                "gnome-terminal".to_string(),
                "x-terminal-emulator".to_string(),
                "xterm".to_string(),
            ],
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dockhand")
}

impl Config {
    /// `$DOCKHAND_CONFIG`, else `config.json` in the platform config dir.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Reads the config at `path`. A missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if path.exists() => path,
            _ => return Ok(Self::default()),
        };
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        Self::from_json(&raw).wrap_err_with(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    pub fn log_follow_interval(&self) -> Duration {
        Duration::from_millis(self.log_follow_interval_ms.max(1))
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            interval: Duration::from_millis(self.sample_interval_ms.max(1)),
            window: self.usage_window,
            frame_budget: self.usage_frame_budget,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join(LOG_FILE))
                .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE))
        })
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
