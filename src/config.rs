use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the sweep interval, in milliseconds.
pub const CHECK_INTERVAL_ENV: &str = "CHECK_INTERVAL";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file")]
    ReadFailed,
    #[error("failed to write config file")]
    WriteFailed,
    #[error("failed to parse config file")]
    ParseFailed,
    #[error("no config path available")]
    ConfigPathUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub scheduler: Scheduler,
    pub probe: Probe,
    pub database: Database,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Scheduler {
    /// Sweep interval in milliseconds
    pub interval_ms: u64,
    /// Delay between consecutive monitor checks within a sweep
    pub check_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Probe {
    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: Scheduler { interval_ms: 300_000, check_delay_ms: 1_000 },
            probe: Probe { timeout_seconds: 30, max_redirects: 5 },
            database: Database { path: "sitewatch.db".into() },
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Configuration:")?;
        writeln!(f, "  Scheduler")?;
        writeln!(f, "    Interval: {} ms", self.scheduler.interval_ms)?;
        writeln!(f, "    Check Delay: {} ms", self.scheduler.check_delay_ms)?;
        writeln!(f, "  Probe")?;
        writeln!(f, "    Timeout: {} s", self.probe.timeout_seconds)?;
        writeln!(f, "    Max Redirects: {}", self.probe.max_redirects)?;
        writeln!(f, "  Database")?;
        writeln!(f, "    Path: {}", self.database.path)?;
        Ok(())
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/sitewatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("sitewatch/config.toml"))
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/sitewatch/config.toml
    /// or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(|_err| Error::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|_err| Error::ParseFailed)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|_err| Error::ParseFailed)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_err| Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(|_err| Error::WriteFailed)
    }

    /// Apply environment overrides. CHECK_INTERVAL (ms) takes precedence
    /// over the configured sweep interval.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(CHECK_INTERVAL_ENV) {
            match raw.parse::<u64>() {
                Ok(interval_ms) => self.scheduler.interval_ms = interval_ms,
                Err(_) => {
                    tracing::warn!(
                        "ignoring invalid {} value: {:?}",
                        CHECK_INTERVAL_ENV,
                        raw
                    );
                }
            }
        }
        self
    }
}
