use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Server settings, read from an optional TOML file. Every key has a
/// default so an empty file (or no file) runs a local instance.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen :       SocketAddr,
    pub database :     PathBuf,
    pub server_name :  String,
    /// Signing key for session cookies. When unset a random key is drawn
    /// at startup and sessions end with the process.
    pub token_secret : Option<String>,
    pub session_days : u32,
    /// Owner given to links that predate per-user ownership.
    pub legacy_owner : Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen :       SocketAddr::from(([127, 0, 0, 1], 3000)),
            database :     PathBuf::from("link_manager.db"),
            server_name :  "link-manager".to_string(),
            token_secret : None,
            session_days : 30,
            legacy_owner : None,
        }
    }
}

impl Config {
    pub fn from_toml(s : &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P : AsRef<Path>>(path : P) -> Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn token_secret(&self) -> Vec<u8> {
        match &self.token_secret {
            Some(s) => s.as_bytes().to_vec(),
            None => {
                use rand::Rng;
                let mut secret = vec![0; 32];
                rand::thread_rng().fill(&mut secret[..]);
                secret
            },
        }
    }
}
