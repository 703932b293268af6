use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative settings file
pub const CONFIG_ENV: &str = "WATCHSTOCK_CONFIG";
/// Environment variable overriding the database connection string
pub const DATABASE_ENV: &str = "WATCHSTOCK_DATABASE";
/// Environment variable overriding the web server bind address
pub const BIND_ENV: &str = "WATCHSTOCK_BIND";

pub const DEFAULT_DATABASE: &str = "watchstock.db";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Runtime settings shared by the CLI and the web server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store connection string, e.g. `sqlite://catalog.db` or `memory://`
    pub database: String,

    /// Address the web server listens on
    pub bind_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path.as_ref()))
    }

    /// Resolves settings from the settings file, if one exists, then the
    /// environment. Missing values fall back to the defaults.
    pub fn resolve() -> Result<Self> {
        let path = settings_path()?;
        let settings = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };

        Ok(settings.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Applies environment-style overrides; empty values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(database) = lookup(DATABASE_ENV) {
            self.database = database;
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind_address = bind;
        }
        self
    }
}

/// Gets the path to the settings file
pub fn settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.watchstock.config
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".watchstock.config"))
}
