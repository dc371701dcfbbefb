//! Accounts file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailpipe_core::Account;
use serde::Deserialize;

/// Contents of `accounts.json`.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Accounts the engine may use.
    pub accounts: Vec<Account>,
    /// Optional file that receives a copy of the log.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Reads and parses the accounts file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}

/// `$CONFIG_DIR/mailpipe/accounts.json`, or `./accounts.json` without a config dir.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map_or_else(|| PathBuf::from("."), |dir| dir.join("mailpipe"))
        .join("accounts.json")
}
