use anyhow::Context;
use serde::Deserialize;
use std::{net::SocketAddr, path::Path, path::PathBuf};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:2121";
pub const DEFAULT_WELCOME: &str = "jailftpd ready";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Text of the 220 greeting.
    pub welcome: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 2121)),
            welcome: DEFAULT_WELCOME.to_string(),
        }
    }
}

/// One `[[users]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub root: PathBuf,
}

impl Config {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read configuration file {}", path.display()))?;

        Self::parse(&text)
            .with_context(|| format!("failed to parse configuration file {}", path.display()))
    }
}
