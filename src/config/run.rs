use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;
use zeroize::Zeroizing;

use super::{AppConfig, EnvStore};
use crate::contracts::WaitPolicy;
use crate::error::DeployError;
use crate::network::{Account, NetworkEndpoint};

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub artifacts_dir: Option<PathBuf>,
}

/// Everything one run needs, resolved up front and passed down explicitly.
#[derive(Clone)]
pub struct RunConfig {
    pub endpoint: NetworkEndpoint,
    pub explorer_url: Option<String>,
    pub private_key: Option<Zeroizing<String>>,
    pub artifacts_dir: PathBuf,
    pub env_path: PathBuf,
    pub wait: WaitPolicy,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("endpoint", &self.endpoint)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("artifacts_dir", &self.artifacts_dir)
            .field("env_path", &self.env_path)
            .field("wait", &self.wait)
            .finish()
    }
}

impl RunConfig {
    /// Resolve settings: command line, then the env store, then the named
    /// network profile.
    pub fn resolve(
        overrides: &Overrides,
        store: &EnvStore,
        profiles: &AppConfig,
        default_artifacts_dir: PathBuf,
        wait: WaitPolicy,
    ) -> Result<Self, DeployError> {
        let network_name = overrides
            .network
            .clone()
            .or_else(|| store.get("NETWORK").map(str::to_string))
            .or_else(|| profiles.default_network().map(str::to_string));

        let profile = match &network_name {
            Some(name) => Some(profiles.get_network(name).ok_or_else(|| {
                DeployError::InvalidConfig {
                    field: "network".to_string(),
                    reason: format!("no network profile named {:?}", name),
                }
            })?),
            None => None,
        };

        let rpc_url = overrides
            .rpc_url
            .clone()
            .or_else(|| store.get("RPC_URL").map(str::to_string))
            .or_else(|| profile.as_ref().map(|p| p.rpc_url.clone()))
            .ok_or_else(|| DeployError::MissingConfig("RPC_URL".to_string()))?;

        let chain_id = match (overrides.chain_id, store.get("CHAIN_ID")) {
            (Some(id), _) => Some(id),
            (None, Some(raw)) => Some(raw.parse::<u64>().map_err(|e| DeployError::InvalidConfig {
                field: "CHAIN_ID".to_string(),
                reason: e.to_string(),
            })?),
            (None, None) => profile.as_ref().and_then(|p| p.chain_id),
        };

        let endpoint = NetworkEndpoint {
            name: network_name,
            chain_id,
            rpc_url,
        };
        // Fail on a malformed URL before anything else happens.
        endpoint.url()?;

        Ok(Self {
            endpoint,
            explorer_url: profile.and_then(|p| p.explorer_url),
            private_key: store.get("PRIVATE_KEY").map(|k| Zeroizing::new(k.to_string())),
            artifacts_dir: overrides
                .artifacts_dir
                .clone()
                .unwrap_or(default_artifacts_dir),
            env_path: store.path().to_path_buf(),
            wait,
        })
    }

    /// The signing identity; required for anything that sends a transaction.
    pub fn account(&self) -> Result<Account, DeployError> {
        let key = self
            .private_key
            .as_ref()
            .ok_or_else(|| DeployError::MissingConfig("PRIVATE_KEY".to_string()))?;
        Account::from_private_key(key)
    }

    /// Resolve a contract reference: an address literal, or a store key
    /// such as `TOKEN_CONTRACT_ADDRESS`.
    pub fn contract_address(
        &self,
        store: &EnvStore,
        reference: &str,
    ) -> Result<Address, DeployError> {
        let raw = if reference.starts_with("0x") {
            reference
        } else {
            store
                .get(reference)
                .ok_or_else(|| DeployError::MissingConfig(reference.to_string()))?
        };

        raw.parse::<Address>().map_err(|e| DeployError::InvalidConfig {
            field: reference.to_string(),
            reason: e.to_string(),
        })
    }
}
