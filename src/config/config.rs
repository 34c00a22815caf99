use crate::constants::{
    DEFAULT_CYCLE_DURATION_SECS, DEFAULT_FAST_TICK_SECS, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_SLOW_TICK_SECS,
};
use crate::{batchwatch_error, batchwatch_error_with_source};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::err::Result;

fn default_fast_secs() -> u64 {
    DEFAULT_FAST_TICK_SECS
}
fn default_slow_secs() -> u64 {
    DEFAULT_SLOW_TICK_SECS
}
fn default_cycle_secs() -> u64 {
    DEFAULT_CYCLE_DURATION_SECS
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TickConfig {
    /// Period of the completion-detection tick.
    #[serde(default = "default_fast_secs")]
    pub fast_secs: u64,
    /// Period of the display-refresh tick.
    #[serde(default = "default_slow_secs")]
    pub slow_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProductionConfig {
    /// Seconds to produce one output unit, uniform across jobs.
    #[serde(default = "default_cycle_secs")]
    pub cycle_duration_secs: u64,
    /// How many recent completion events the board retains.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            fast_secs: DEFAULT_FAST_TICK_SECS,
            slow_secs: DEFAULT_SLOW_TICK_SECS,
        }
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            cycle_duration_secs: DEFAULT_CYCLE_DURATION_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ticks: TickConfig,
    #[serde(default)]
    pub production: ProductionConfig,
}

fn expand_tilde(p: &str) -> String {
    // Expand leading '~/' HOME to support shell-like paths in config defaults
    if let Some(rest) = p.strip_prefix("~/") {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home, rest),
            Err(_) => p.to_string(),
        }
    } else {
        p.to_string()
    }
}

impl Config {
    pub fn from_config(config_path: Option<&str>) -> Result<Self> {
        match config_path {
            Some(p) => {
                let path = expand_tilde(p);
                let content = fs::read_to_string(&path)
                    .map_err(|e| batchwatch_error_with_source!(e, "cannot read config {}", path))?;
                let config: Config = toml::from_str(&content)
                    .map_err(|e| batchwatch_error_with_source!(e, "cannot parse config {}", path))?;
                config.validated()
            }
            None => Err("No config file provided".into()),
        }
    }

    /// Numeric job/tick fields are validated here, at the boundary; the
    /// scheduler core assumes they arrive sane.
    pub fn validated(self) -> Result<Self> {
        if self.ticks.fast_secs == 0 || self.ticks.slow_secs == 0 {
            return Err(batchwatch_error!(
                "tick periods must be at least 1 second (fast={}, slow={})",
                self.ticks.fast_secs,
                self.ticks.slow_secs
            )
            .into());
        }
        if self.production.cycle_duration_secs == 0 {
            return Err(batchwatch_error!("cycle_duration_secs must be at least 1").into());
        }
        if self.production.history_capacity == 0 {
            return Err(batchwatch_error!("history_capacity must be at least 1").into());
        }
        Ok(self)
    }

    pub fn dump(&self, config_path: &str) -> Result<()> {
        let path = Path::new(config_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let p = fs::File::create(path)?;
        let mut f_writer = std::io::BufWriter::new(p);
        f_writer.write_all(toml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Load the config at `config_path` if one was given, otherwise fall back to
/// defaults. A given-but-broken path is an error; silently running with wrong
/// tick periods would be worse than refusing to start.
pub fn load_or_default(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(p) => Config::from_config(Some(p)),
        None => Ok(Config::default()),
    }
}
