/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed sign-in configuration and the components it describes
[POS]:    Configuration layer - relying party, chain node and storage setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{ClientConfig, Result, SiwaError, MAINNET_NODE_URL};
use crate::session::{JsonFileStore, SessionStore};
use crate::siwa::ChallengeSettings;

/// Top-level configuration for a sign-in client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiwaConfig {
    /// Chain node used for suggested params and the genesis fingerprint
    #[serde(default = "default_node_url")]
    pub node_url: String,
    /// Domain the challenge is bound to (host[:port])
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_statement")]
    pub statement: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    /// Algorand mainnet chain id
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// JSON file holding the persisted session
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    /// Full URL of the relying party's verify route
    #[serde(default = "default_verify_endpoint")]
    pub verify_endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SiwaConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            domain: default_domain(),
            uri: default_uri(),
            statement: default_statement(),
            version: default_version(),
            chain_id: default_chain_id(),
            session_file: default_session_file(),
            verify_endpoint: default_verify_endpoint(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_node_url() -> String {
    MAINNET_NODE_URL.to_string()
}

fn default_domain() -> String {
    "localhost:3000".to_string()
}

fn default_uri() -> String {
    "http://localhost:3000".to_string()
}

fn default_statement() -> Option<String> {
    Some("Sign in with Algorand to the app.".to_string())
}

fn default_version() -> String {
    "1".to_string()
}

fn default_chain_id() -> u64 {
    416001
}

fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("siwa-connect")
        .join("session.json")
}

fn default_verify_endpoint() -> String {
    "http://localhost:3000/api/verify".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl SiwaConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SiwaError::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| SiwaError::Config(e.to_string()))
    }

    /// Relying-party fields stamped on every challenge
    pub fn challenge_settings(&self) -> ChallengeSettings {
        ChallengeSettings {
            domain: self.domain.clone(),
            uri: self.uri.clone(),
            statement: self.statement.clone().filter(|s| !s.trim().is_empty()),
            version: self.version.clone(),
            chain_id: self.chain_id,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Session store backed by `session_file`
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(Arc::new(JsonFileStore::new(&self.session_file)))
    }
}
