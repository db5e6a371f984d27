use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::DeployError;

const CONFIG_DIR: &str = "deployer";
const CONFIG_FILE: &str = "config.toml";

/// Named network profiles, from `<config dir>/deployer/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,

    #[serde(default)]
    pub defaults: Option<Defaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    pub network: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default location, or start empty.
    pub fn load() -> Result<Self, DeployError> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, DeployError> {
        let invalid = |reason: String| DeployError::InvalidConfig {
            field: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        toml::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// The network to use when none is named on the command line.
    pub fn default_network(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.network.as_deref())
    }

    /// A network by name; profiles in the file shadow the built-in ones.
    pub fn get_network(&self, name: &str) -> Option<NetworkConfig> {
        self.networks
            .get(name)
            .cloned()
            .or_else(|| builtin_network(name))
    }
}

fn builtin_network(name: &str) -> Option<NetworkConfig> {
    match name {
        "base-sepolia" => Some(NetworkConfig {
            rpc_url: "https://sepolia.base.org".to_string(),
            chain_id: Some(84532),
            explorer_url: Some("https://sepolia.basescan.org".to_string()),
        }),
        "sepolia" => Some(NetworkConfig {
            rpc_url: "https://sepolia.drpc.org".to_string(),
            chain_id: Some(11155111),
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        }),
        "anvil" | "localhost" => Some(NetworkConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: Some(31337),
            explorer_url: None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let content = r#"
[networks.base-sepolia]
rpc_url = "https://base-sepolia.g.alchemy.com/v2/xxx"
chain_id = 84532

[networks.devnet]
rpc_url = "http://10.0.0.5:8545"

[defaults]
network = "devnet"
"#;

        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.default_network(), Some("devnet"));
        assert_eq!(
            config.get_network("base-sepolia").unwrap().rpc_url,
            "https://base-sepolia.g.alchemy.com/v2/xxx"
        );
        assert_eq!(config.get_network("devnet").unwrap().chain_id, None);
    }

    #[test]
    fn test_builtin_networks() {
        let config = AppConfig::default();
        assert_eq!(config.get_network("base-sepolia").unwrap().chain_id, Some(84532));
        assert_eq!(config.get_network("anvil").unwrap().chain_id, Some(31337));
        assert!(config.get_network("nowhere").is_none());
        assert_eq!(config.default_network(), None);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "networks = 3").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(DeployError::InvalidConfig { .. })
        ));
    }
}
