use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};

use crate::config::{PersistenceWarning, persist_entry};
use crate::contracts::{
    ArtifactLoader, CompiledArtifact, SubmitOptions, Submission, WaitOutcome, WaitPolicy,
    abi::{find_function, is_read_only},
    read_contract, submit, wait_for_receipt,
};
use crate::error::DeployError;
use crate::network::{NetworkClients, PendingTransaction, ReadClient, TransactionReceipt, verify_chain};
use crate::preflight::{self, PreflightReport};

/// Lifecycle of one deploy or call, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuring,
    ArtifactLoaded,
    ClientsReady,
    PreflightChecked,
    Submitted,
    AwaitingReceipt,
    Confirmed,
    Reverted,
    TimedOut,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuring => "configuring",
            Stage::ArtifactLoaded => "artifact loaded",
            Stage::ClientsReady => "clients ready",
            Stage::PreflightChecked => "preflight checked",
            Stage::Submitted => "submitted",
            Stage::AwaitingReceipt => "awaiting receipt",
            Stage::Confirmed => "confirmed",
            Stage::Reverted => "reverted",
            Stage::TimedOut => "timed out",
        };
        write!(f, "{}", name)
    }
}

pub fn enter(stage: Stage) {
    tracing::info!("=> {}", stage);
}

/// Final state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Confirmed(TransactionReceipt),
    /// Mined, but the contract rejected it. A normal result, not an error.
    Reverted(TransactionReceipt),
    /// The wait gave up; the transaction may still land.
    TimedOut { hash: TxHash, waited: Duration },
}

impl TxResult {
    fn from_wait(outcome: WaitOutcome) -> Self {
        match outcome {
            WaitOutcome::Mined(receipt) if receipt.is_success() => TxResult::Confirmed(receipt),
            WaitOutcome::Mined(receipt) => TxResult::Reverted(receipt),
            WaitOutcome::TimedOut { hash, waited } => TxResult::TimedOut { hash, waited },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            TxResult::Confirmed(_) => Stage::Confirmed,
            TxResult::Reverted(_) => Stage::Reverted,
            TxResult::TimedOut { .. } => Stage::TimedOut,
        }
    }

    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            TxResult::Confirmed(receipt) | TxResult::Reverted(receipt) => Some(receipt),
            TxResult::TimedOut { .. } => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxResult::Confirmed(_))
    }
}

/// Where a deployed address gets recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistTarget {
    pub path: PathBuf,
    pub key: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub artifact: String,
    pub args: Vec<String>,
    pub persist: Option<PersistTarget>,
    pub options: SubmitOptions,
}

#[derive(Debug)]
pub struct DeployOutcome {
    pub artifact: String,
    pub preflight: PreflightReport,
    pub pending: PendingTransaction,
    pub result: TxResult,
    /// Key and value written to the env store.
    pub persisted: Option<(String, String)>,
    pub persistence_warning: Option<PersistenceWarning>,
}

impl DeployOutcome {
    pub fn contract_address(&self) -> Option<Address> {
        self.result.receipt().and_then(|r| r.contract_address)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvokeRequest {
    /// Artifact holding the contract's ABI.
    pub artifact: String,
    pub address: Address,
    pub function: String,
    pub args: Vec<String>,
    pub value: Option<U256>,
    pub options: SubmitOptions,
    /// Zero-argument view function to query once the call is confirmed.
    pub read_back: Option<String>,
}

#[derive(Debug)]
pub struct InvokeOutcome {
    pub function: String,
    pub preflight: PreflightReport,
    pub pending: PendingTransaction,
    pub result: TxResult,
    pub read_back: Option<(String, Vec<String>)>,
}

/// Runs deployments and calls for one account on one network.
pub struct Deployer<'a> {
    clients: &'a NetworkClients,
    artifacts: &'a ArtifactLoader,
    wait: WaitPolicy,
    expected_chain: Option<u64>,
}

impl<'a> Deployer<'a> {
    pub fn new(clients: &'a NetworkClients, artifacts: &'a ArtifactLoader, wait: WaitPolicy) -> Self {
        Self {
            clients,
            artifacts,
            wait,
            expected_chain: None,
        }
    }

    /// Refuse to submit when the endpoint serves another chain.
    pub fn expect_chain(mut self, chain_id: Option<u64>) -> Self {
        self.expected_chain = chain_id;
        self
    }

    /// Load the artifact, check the endpoint and run the preflight checks.
    async fn prepare(&self, artifact: &str) -> Result<(CompiledArtifact, PreflightReport), DeployError> {
        let artifact = self.artifacts.load(artifact)?;
        enter(Stage::ArtifactLoaded);

        let chain_id = verify_chain(self.clients.read.as_ref(), self.expected_chain).await?;
        tracing::info!("Connected to chain {} as {}", chain_id, self.clients.account());
        enter(Stage::ClientsReady);

        let report = preflight::check(self.clients.read.as_ref(), self.clients.account()).await?;
        enter(Stage::PreflightChecked);

        Ok((artifact, report))
    }

    async fn send_and_wait(
        &self,
        submission: &Submission<'_>,
        options: SubmitOptions,
    ) -> Result<(PendingTransaction, TxResult), DeployError> {
        let pending = submit(self.clients.write.as_ref(), submission, options).await?;
        enter(Stage::Submitted);

        enter(Stage::AwaitingReceipt);
        let outcome = wait_for_receipt(self.clients.read.as_ref(), &pending, &self.wait).await?;
        let result = TxResult::from_wait(outcome);
        enter(result.stage());

        Ok((pending, result))
    }

    /// Deploy a contract. The address is persisted only after a successful
    /// receipt, and a failed write never fails the deployment.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, DeployError> {
        let (artifact, preflight) = self.prepare(&request.artifact).await?;

        let submission = Submission::Deploy {
            artifact: &artifact,
            args: &request.args,
        };
        let (pending, result) = self.send_and_wait(&submission, request.options).await?;

        let mut persisted = None;
        let mut persistence_warning = None;

        if let (TxResult::Confirmed(receipt), Some(target)) = (&result, &request.persist) {
            match persist_address(target, receipt) {
                Ok(entry) => persisted = Some(entry),
                Err(warning) => {
                    tracing::warn!("{}", warning);
                    persistence_warning = Some(warning);
                }
            }
        }

        Ok(DeployOutcome {
            artifact: artifact.name,
            preflight,
            pending,
            result,
            persisted,
            persistence_warning,
        })
    }

    /// Call a state-changing function on a deployed contract.
    pub async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeOutcome, DeployError> {
        let (artifact, preflight) = self.prepare(&request.artifact).await?;

        let function = find_function(&artifact.abi, &request.function, request.args.len())
            .map_err(|reason| DeployError::Encoding {
                target: request.function.clone(),
                reason,
            })?;
        if is_read_only(function) {
            tracing::warn!(
                "{} is a view function; sending it as a transaction changes nothing",
                function.signature()
            );
        }

        let submission = Submission::Invoke {
            address: request.address,
            function,
            args: &request.args,
            value: request.value,
        };
        let (pending, result) = self.send_and_wait(&submission, request.options).await?;

        let read_back = match (&request.read_back, result.is_confirmed()) {
            (Some(name), true) => {
                read_back(self.clients.read.as_ref(), &artifact, request.address, name).await
            }
            _ => None,
        };

        Ok(InvokeOutcome {
            function: function.signature(),
            preflight,
            pending,
            result,
            read_back,
        })
    }
}

fn persist_address(
    target: &PersistTarget,
    receipt: &TransactionReceipt,
) -> Result<(String, String), PersistenceWarning> {
    let Some(address) = receipt.contract_address else {
        return Err(PersistenceWarning {
            path: target.path.clone(),
            key: target.key.clone(),
            value: String::new(),
            reason: "receipt carries no contract address".to_string(),
        });
    };

    let value = address.to_checksum(None);
    persist_entry(&target.path, &target.key, &value)?;
    Ok((target.key.clone(), value))
}

/// Query a view function after a confirmed call. Failures only warn.
async fn read_back(
    read: &dyn ReadClient,
    artifact: &CompiledArtifact,
    address: Address,
    name: &str,
) -> Option<(String, Vec<String>)> {
    let result = match find_function(&artifact.abi, name, 0) {
        Ok(function) => read_contract(read, address, function, &[]).await,
        Err(reason) => Err(DeployError::Encoding {
            target: name.to_string(),
            reason,
        }),
    };

    match result {
        Ok(values) => Some((name.to_string(), values)),
        Err(e) => {
            tracing::warn!("Read-back of {} failed: {}", name, e);
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub artifact: String,
    pub address: Address,
    pub function: String,
    pub args: Vec<String>,
}

/// Run a read-only call; needs no signing key.
pub async fn read(
    read: &dyn ReadClient,
    artifacts: &ArtifactLoader,
    request: &ReadRequest,
) -> Result<Vec<String>, DeployError> {
    let artifact = artifacts.load(&request.artifact)?;
    let function = find_function(&artifact.abi, &request.function, request.args.len())
        .map_err(|reason| DeployError::Encoding {
            target: request.function.clone(),
            reason,
        })?;

    if !is_read_only(function) {
        tracing::warn!(
            "{} is not a view function; the result is simulated and nothing is sent",
            function.signature()
        );
    }

    read_contract(read, request.address, function, &request.args).await
}
