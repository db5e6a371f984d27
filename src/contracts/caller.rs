use alloy::{
    json_abi::Function,
    network::TransactionBuilder,
    primitives::{Address, U256},
    rpc::types::TransactionRequest,
};

use super::abi::{decode_output, encode_call, encode_constructor_args};
use super::artifact::CompiledArtifact;
use crate::error::DeployError;
use crate::network::{PendingTransaction, ReadClient, WriteClient};

/// One state-changing transaction to broadcast.
#[derive(Debug, Clone, Copy)]
pub enum Submission<'a> {
    /// Contract creation: bytecode followed by encoded constructor arguments.
    Deploy {
        artifact: &'a CompiledArtifact,
        args: &'a [String],
    },
    /// Call into an existing contract.
    Invoke {
        address: Address,
        function: &'a Function,
        args: &'a [String],
        value: Option<U256>,
    },
}

impl Submission<'_> {
    fn target(&self) -> String {
        match self {
            Submission::Deploy { artifact, .. } => format!("{} constructor", artifact.name),
            Submission::Invoke { function, .. } => function.signature(),
        }
    }
}

/// Opt-in controls for callers that need safe resubmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Reusing the nonce of an earlier attempt makes the new transaction
    /// replace it instead of executing a second time.
    pub nonce: Option<u64>,
}

/// Build the unsigned request for a submission.
pub fn build_request(
    from: Address,
    submission: &Submission<'_>,
    options: SubmitOptions,
) -> Result<TransactionRequest, DeployError> {
    let encoding_error = |reason: String| DeployError::Encoding {
        target: submission.target(),
        reason,
    };

    let mut tx = match submission {
        Submission::Deploy { artifact, args } => {
            let encoded_args =
                encode_constructor_args(&artifact.abi, args).map_err(encoding_error)?;

            let mut code = artifact.bytecode.to_vec();
            code.extend(encoded_args);

            TransactionRequest::default().from(from).with_deploy_code(code)
        }
        Submission::Invoke {
            address,
            function,
            args,
            value,
        } => {
            let calldata = encode_call(function, args).map_err(encoding_error)?;

            let mut tx = TransactionRequest::default()
                .from(from)
                .to(*address)
                .input(calldata.into());

            if let Some(v) = value {
                tx = tx.value(*v);
            }
            tx
        }
    };

    if let Some(nonce) = options.nonce {
        tx = tx.nonce(nonce);
    }

    Ok(tx)
}

/// Sign and broadcast exactly one transaction. Never retries: a failed send
/// may or may not have reached the mempool, and a blind resend of a
/// state-changing call can execute twice.
pub async fn submit(
    write: &dyn WriteClient,
    submission: &Submission<'_>,
    options: SubmitOptions,
) -> Result<PendingTransaction, DeployError> {
    let request = build_request(write.address(), submission, options)?;

    let hash = write.send_transaction(request).await.map_err(|e| {
        tracing::error!("Submission of {} failed: {}", submission.target(), e);
        DeployError::Submission(e)
    })?;

    tracing::info!("Submitted {} as {}", submission.target(), hash);
    Ok(PendingTransaction { hash })
}

/// Execute a read-only call (view/pure function) and decode its outputs.
pub async fn read_contract(
    read: &dyn ReadClient,
    address: Address,
    function: &Function,
    args: &[String],
) -> Result<Vec<String>, DeployError> {
    let calldata = encode_call(function, args).map_err(|reason| DeployError::Encoding {
        target: function.signature(),
        reason,
    })?;

    let result = read
        .call(address, calldata.into())
        .await
        .map_err(|source| DeployError::Query {
            context: format!("read call {} failed", function.name),
            source,
        })?;

    decode_output(function, &result).map_err(|reason| DeployError::Query {
        context: format!("read call {} returned unexpected data", function.name),
        source: crate::network::RpcError::new("eth_call", reason),
    })
}
