pub mod abi;
mod artifact;
mod caller;
mod receipt;

#[cfg(test)]
pub(crate) use artifact::tests::write_token_artifact;

pub use artifact::{ArtifactLoader, CompiledArtifact};
pub use caller::{SubmitOptions, Submission, read_contract, submit};
pub use receipt::{
    DEFAULT_CONFIRMATIONS, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, WaitOutcome, WaitPolicy,
    wait_for_receipt,
};
