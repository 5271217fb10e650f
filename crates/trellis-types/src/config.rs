//! Shell configuration.
//!
//! ```toml
//! name = "edge-router"
//! prompt = "%(name)s %(path)s%% "
//! traceback_depth = 8
//! history_file = "/var/lib/edge/history"
//!
//! [listen]
//! address = "0.0.0.0"
//! port = 2323
//! max_connections = 8
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TrellisError};

/// Prompt template used when none is configured.
pub const DEFAULT_PROMPT: &str = "%(name)s %(path)s%% ";

/// Per-session shell settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell name substituted for `%(name)s` in the prompt.
    pub name: String,
    /// Prompt template supporting `%(name)s`, `%(path)s` and `%%`.
    pub prompt: String,
    /// How many handler faults are kept for `traceback`.
    pub traceback_depth: usize,
    /// Accepted lines are appended here and reloaded on start.
    pub history_file: Option<PathBuf>,
    /// Serve sessions over TCP instead of the local console.
    pub listen: Option<ListenConfig>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: "cli".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            traceback_depth: 8,
            history_file: None,
            listen: None,
        }
    }
}

/// TCP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2323
}

fn default_max_connections() -> usize {
    8
}

impl ShellConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrellisError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrellisError::Config("name must not be empty".to_string()));
        }
        if let Some(listen) = &self.listen
            && listen.max_connections == 0
        {
            return Err(TrellisError::Config(
                "listen.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
