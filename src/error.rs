use std::fmt;
use std::path::PathBuf;

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::network::RpcError;

/// Failures raised by the deployment pipeline.
///
/// Components return these unclassified; only the binary boundary turns them
/// into an [`ErrorKind`] with a remediation hint (see [`classify`]).
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0} is not set")]
    MissingConfig(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("compiled artifact for {name} not found (searched: {searched})")]
    ArtifactNotFound { name: String, searched: String },

    #[error("invalid artifact {path:?}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("cannot encode arguments for {target}: {reason}")]
    Encoding { target: String, reason: String },

    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: RpcError,
    },

    #[error("failed to send transaction: {0}")]
    Submission(#[source] RpcError),

    #[error("lost track of transaction {hash} while waiting for its receipt: {source}")]
    ReceiptWait {
        hash: TxHash,
        #[source]
        source: RpcError,
    },
}

impl DeployError {
    /// The kind this failure belongs to before any message-based refinement.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::MissingConfig(_) | DeployError::InvalidConfig { .. } => {
                ErrorKind::Configuration
            }
            DeployError::ArtifactNotFound { .. } | DeployError::InvalidArtifact { .. } => {
                ErrorKind::ArtifactNotFound
            }
            DeployError::Encoding { .. }
            | DeployError::Query { .. }
            | DeployError::Submission(_) => ErrorKind::Submission,
            DeployError::ReceiptWait { .. } => ErrorKind::ReceiptWait,
        }
    }
}

/// Closed set of failure categories reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ArtifactNotFound,
    InsufficientFunds,
    Submission,
    ReceiptWait,
    RevertedExecution,
    PersistenceWarning,
}

impl ErrorKind {
    pub fn hint(self) -> &'static str {
        match self {
            ErrorKind::Configuration => {
                "check PRIVATE_KEY, RPC_URL and contract address entries in the env file"
            }
            ErrorKind::ArtifactNotFound => {
                "compile the contract first, then re-run with --artifacts pointing at the output"
            }
            ErrorKind::InsufficientFunds => {
                "fund the account from a testnet faucet and try again"
            }
            ErrorKind::Submission => {
                "nothing was retried; check the arguments and the RPC endpoint before resubmitting"
            }
            ErrorKind::ReceiptWait => {
                "the transaction may still be mined; look up its hash on the explorer before resubmitting"
            }
            ErrorKind::RevertedExecution => {
                "the contract rejected the call; check the contract address, ABI and arguments"
            }
            ErrorKind::PersistenceWarning => {
                "the deployment stands; add the address to the env file by hand"
            }
        }
    }

    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::PersistenceWarning)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::ArtifactNotFound => "ArtifactNotFoundError",
            ErrorKind::InsufficientFunds => "InsufficientFundsError",
            ErrorKind::Submission => "SubmissionError",
            ErrorKind::ReceiptWait => "ReceiptWaitError",
            ErrorKind::RevertedExecution => "RevertedExecution",
            ErrorKind::PersistenceWarning => "PersistenceWarning",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub message: String,
    pub hint: &'static str,
}

/// Classify a report that reached the binary boundary.
pub fn classify(report: &eyre::Report) -> Classification {
    let kind = report
        .downcast_ref::<DeployError>()
        .or_else(|| report.chain().find_map(|e| e.downcast_ref::<DeployError>()))
        .map(DeployError::kind);

    // Typed errors already print their source; don't repeat it.
    let mut message = String::new();
    for cause in report.chain() {
        let text = cause.to_string();
        if message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }

    classify_message(kind, &message)
}

/// Refine a typed kind using the failure text. Node errors only reach us as
/// strings, so funding and revert failures are recognised by their wording.
pub fn classify_message(kind: Option<ErrorKind>, message: &str) -> Classification {
    let lower = message.to_lowercase();

    let kind = if lower.contains("insufficient funds") {
        ErrorKind::InsufficientFunds
    } else if lower.contains("execution reverted") {
        ErrorKind::RevertedExecution
    } else if let Some(kind) = kind {
        kind
    } else if lower.contains("private_key") || lower.contains("rpc_url") {
        ErrorKind::Configuration
    } else {
        ErrorKind::Submission
    };

    Classification {
        kind,
        message: message.to_string(),
        hint: kind.hint(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(message: &str) -> RpcError {
        RpcError::new("eth_sendTransaction", message)
    }

    #[test]
    fn test_typed_kinds() {
        let missing: eyre::Report = DeployError::MissingConfig("PRIVATE_KEY".into()).into();
        assert_eq!(classify(&missing).kind, ErrorKind::Configuration);

        let artifact: eyre::Report = DeployError::ArtifactNotFound {
            name: "Token".into(),
            searched: "compiled/Token.json".into(),
        }
        .into();
        let classified = classify(&artifact);
        assert_eq!(classified.kind, ErrorKind::ArtifactNotFound);
        assert!(classified.hint.contains("compile"));

        let wait: eyre::Report = DeployError::ReceiptWait {
            hash: TxHash::ZERO,
            source: RpcError::new("eth_getTransactionReceipt", "connection reset"),
        }
        .into();
        assert_eq!(classify(&wait).kind, ErrorKind::ReceiptWait);
    }

    #[test]
    fn test_insufficient_funds_wins_over_submission() {
        let report: eyre::Report = DeployError::Submission(rpc(
            "insufficient funds for gas * price + value: have 0 want 21000",
        ))
        .into();
        let classified = classify(&report);
        assert_eq!(classified.kind, ErrorKind::InsufficientFunds);
        assert_eq!(classified.message.matches("have 0 want 21000").count(), 1);
    }

    #[test]
    fn test_revert_text_is_recognised() {
        let report: eyre::Report = DeployError::Query {
            context: "read call balanceOf failed".into(),
            source: RpcError::new("eth_call", "execution reverted: not owner"),
        }
        .into();
        assert_eq!(classify(&report).kind, ErrorKind::RevertedExecution);
    }

    #[test]
    fn test_context_does_not_hide_kind() {
        use eyre::WrapErr;

        let result: Result<(), DeployError> =
            Err(DeployError::MissingConfig("RPC_URL".to_string()));
        let report = result.wrap_err("Failed to prepare deployment").unwrap_err();
        assert_eq!(classify(&report).kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_untyped_fallbacks() {
        assert_eq!(
            classify_message(None, "PRIVATE_KEY missing").kind,
            ErrorKind::Configuration
        );
        assert_eq!(
            classify_message(None, "connection refused").kind,
            ErrorKind::Submission
        );
    }

    #[test]
    fn test_only_persistence_is_recoverable() {
        assert!(ErrorKind::PersistenceWarning.is_recoverable());
        assert!(!ErrorKind::ReceiptWait.is_recoverable());
        assert!(!ErrorKind::InsufficientFunds.is_recoverable());
    }
}
