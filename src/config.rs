//! Optional TOML configuration
//!
//! ```toml
//! filters = ["errors.xml", "noise.json"]
//! color = true
//!
//! [[process_colors]]
//! process = "service.exe"
//! color = 0x1BA1E2
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use logsieve_filter::{ProcessColors, Rgb};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Filter files merged in order at startup
    pub filters: Vec<PathBuf>,

    /// Color visible lines with their decision color
    pub color: bool,

    /// Print counters to stderr at the end of the stream
    pub stats: bool,

    /// Only print lines a Track rule matched
    pub only_tracked: bool,

    pub process_colors: Vec<ProcessColorEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            color: true,
            stats: false,
            only_tracked: false,
            process_colors: Vec::new(),
        }
    }
}

/// Fixed color for a process, by name or pid
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProcessColorEntry {
    pub process: Option<String>,
    pub pid: Option<u32>,
    pub color: u32,
}

impl Config {
    /// Registry handed to the filter store
    pub fn process_colors(&self) -> ProcessColors {
        let mut colors = ProcessColors::new();
        for entry in &self.process_colors {
            let color = Rgb::from_packed(entry.color);
            if let Some(pid) = entry.pid {
                colors.set_pid(pid, color);
            }
            if let Some(process) = &entry.process {
                colors.set_name(process, color);
            }
        }
        colors
    }
}

/// Load a config file; relative filter paths are taken from its directory
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg = load_from_str(&contents)?;

    if let Some(dir) = path.parent() {
        for filter in &mut cfg.filters {
            if filter.is_relative() {
                *filter = dir.join(&*filter);
            }
        }
    }
    Ok(cfg)
}

pub fn load_from_str(toml: &str) -> Result<Config, ConfigError> {
    let cfg: Config = toml::from_str(toml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    for (i, entry) in cfg.process_colors.iter().enumerate() {
        if entry.color > 0xff_ffff {
            return Err(ConfigError::Validation(format!(
                "process_colors[{i}].color {:#x} is not a 0xRRGGBB value",
                entry.color
            )));
        }
        match (&entry.process, entry.pid) {
            (None, None) => {
                return Err(ConfigError::Validation(format!(
                    "process_colors[{i}] needs a process or a pid"
                )));
            }
            (Some(name), _) if name.trim().is_empty() => {
                return Err(ConfigError::Validation(format!(
                    "process_colors[{i}].process must not be empty"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
