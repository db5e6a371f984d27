mod provider;
#[cfg(test)]
pub mod stub;
mod types;

pub use provider::{AlloyReadClient, AlloyWriteClient};
pub use types::{EventLog, PendingTransaction, ReceiptStatus, TransactionReceipt};

use std::fmt;

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::DeployError;

/// A failed RPC round trip, tagged with the method that failed.
#[derive(Debug, Clone, Error)]
#[error("{method}: {message}")]
pub struct RpcError {
    pub method: &'static str,
    pub message: String,
}

impl RpcError {
    pub fn new(method: &'static str, message: impl fmt::Display) -> Self {
        Self {
            method,
            message: message.to_string(),
        }
    }
}

/// Query-only access to the network.
#[async_trait]
pub trait ReadClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    async fn balance(&self, address: Address) -> Result<U256, RpcError>;

    /// Current gas price in wei. Never cached.
    async fn gas_price(&self) -> Result<u128, RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError>;

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError>;

    /// Returns `None` while the transaction is not yet mined.
    async fn transaction_receipt(&self, hash: TxHash)
    -> Result<Option<TransactionReceipt>, RpcError>;
}

/// Signing access bound to one account.
#[async_trait]
pub trait WriteClient: Send + Sync {
    fn address(&self) -> Address;

    /// Sign and broadcast exactly one transaction.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, RpcError>;
}

/// The single signing identity of a run.
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    pub fn from_private_key(private_key: &Zeroizing<String>) -> Result<Self, DeployError> {
        let key_str = private_key.trim();
        if key_str.is_empty() {
            return Err(DeployError::MissingConfig("PRIVATE_KEY".to_string()));
        }
        let clean_key = key_str.strip_prefix("0x").unwrap_or(key_str);

        let signer = clean_key
            .parse::<PrivateKeySigner>()
            .map_err(|e| DeployError::InvalidConfig {
                field: "PRIVATE_KEY".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .finish()
    }
}

/// Where the network lives. Shared by every client of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub name: Option<String>,
    /// Expected chain id; checked against the node when set.
    pub chain_id: Option<u64>,
    pub rpc_url: String,
}

impl NetworkEndpoint {
    pub fn url(&self) -> Result<Url, DeployError> {
        if self.rpc_url.trim().is_empty() {
            return Err(DeployError::MissingConfig("RPC_URL".to_string()));
        }
        self.rpc_url
            .trim()
            .parse::<Url>()
            .map_err(|e| DeployError::InvalidConfig {
                field: "RPC_URL".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Read and write clients for one account on one endpoint.
pub struct NetworkClients {
    pub read: Box<dyn ReadClient>,
    pub write: Box<dyn WriteClient>,
}

impl NetworkClients {
    pub fn new(read: Box<dyn ReadClient>, write: Box<dyn WriteClient>) -> Self {
        Self { read, write }
    }

    pub fn account(&self) -> Address {
        self.write.address()
    }
}

/// Build both clients. Only opens the transport; no request is sent.
pub fn connect(endpoint: &NetworkEndpoint, account: &Account) -> Result<NetworkClients, DeployError> {
    let url = endpoint.url()?;
    tracing::debug!("Connecting to {} as {}", url, account.address());

    let read = AlloyReadClient::connect(url.clone());
    let write = AlloyWriteClient::connect(url, account);

    Ok(NetworkClients::new(Box::new(read), Box::new(write)))
}

/// Build a query-only client; no signing key is needed.
pub fn connect_read_only(endpoint: &NetworkEndpoint) -> Result<Box<dyn ReadClient>, DeployError> {
    let url = endpoint.url()?;
    Ok(Box::new(AlloyReadClient::connect(url)))
}

/// Fail when the node serves a different chain than the configuration names.
pub async fn verify_chain(read: &dyn ReadClient, expected: Option<u64>) -> Result<u64, DeployError> {
    let actual = read.chain_id().await.map_err(|source| DeployError::Query {
        context: "failed to fetch chain id".to_string(),
        source,
    })?;

    match expected {
        Some(expected) if expected != actual => Err(DeployError::InvalidConfig {
            field: "CHAIN_ID".to_string(),
            reason: format!("configured {} but the RPC endpoint serves chain {}", expected, actual),
        }),
        _ => Ok(actual),
    }
}
