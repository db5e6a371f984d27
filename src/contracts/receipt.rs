use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::Instant;

use crate::error::DeployError;
use crate::network::{PendingTransaction, ReadClient, TransactionReceipt};

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// How long and how deep to wait for a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Blocks at or above the receipt's block, counting that block itself.
    pub confirmations: u64,
    pub poll_interval: Duration,
    /// `None` waits forever.
    pub max_wait: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

/// Result of waiting on a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Mined at the required depth. The receipt may still carry a revert.
    Mined(TransactionReceipt),
    /// Gave up; the transaction may still be mined later.
    TimedOut { hash: TxHash, waited: Duration },
}

/// Poll until the receipt reaches the policy's confirmation depth.
///
/// Reverted receipts come back as [`WaitOutcome::Mined`]; only transport
/// faults are errors.
pub async fn wait_for_receipt(
    read: &dyn ReadClient,
    pending: &PendingTransaction,
    policy: &WaitPolicy,
) -> Result<WaitOutcome, DeployError> {
    let hash = pending.hash;
    let depth = policy.confirmations.max(1);
    let started = Instant::now();
    let transport = |source| DeployError::ReceiptWait { hash, source };

    tracing::info!(
        "Waiting for {} confirmation(s) of {} (timeout: {})",
        depth,
        hash,
        policy
            .max_wait
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "none".to_string())
    );

    loop {
        if let Some(receipt) = read.transaction_receipt(hash).await.map_err(transport)? {
            let reached = if depth == 1 {
                1
            } else {
                let latest = read.block_number().await.map_err(transport)?;
                latest.saturating_sub(receipt.block_number) + 1
            };

            if reached >= depth {
                tracing::info!(
                    "Transaction {} mined in block {} with status {:?}",
                    hash,
                    receipt.block_number,
                    receipt.status
                );
                return Ok(WaitOutcome::Mined(receipt));
            }

            tracing::debug!("{} has {}/{} confirmations", hash, reached, depth);
        }

        let waited = started.elapsed();
        if let Some(max_wait) = policy.max_wait {
            if waited >= max_wait {
                tracing::warn!("Gave up waiting for {} after {:?}", hash, waited);
                return Ok(WaitOutcome::TimedOut { hash, waited });
            }
        }

        tokio::time::sleep(policy.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::stub::{StubNetwork, StubOutcome};
    use crate::network::{ReceiptStatus, WriteClient};
    use alloy::{primitives::Address, rpc::types::TransactionRequest};

    fn fast_policy() -> WaitPolicy {
        WaitPolicy {
            confirmations: 1,
            poll_interval: Duration::from_millis(5),
            max_wait: Some(Duration::from_millis(500)),
        }
    }

    async fn send(stub: &StubNetwork) -> PendingTransaction {
        let hash = stub
            .send_transaction(TransactionRequest::default().to(Address::repeat_byte(0xcc)))
            .await
            .unwrap();
        PendingTransaction { hash }
    }

    #[tokio::test]
    async fn test_status_matches_stub_outcome() {
        for (outcome, status) in [
            (StubOutcome::Success, ReceiptStatus::Success),
            (StubOutcome::Revert, ReceiptStatus::Failure),
        ] {
            let stub = StubNetwork::new().with_outcome(outcome);
            let pending = send(&stub).await;

            match wait_for_receipt(&stub, &pending, &fast_policy()).await.unwrap() {
                WaitOutcome::Mined(receipt) => {
                    assert_eq!(receipt.status, status);
                    assert_eq!(receipt.hash, pending.hash);
                }
                other => panic!("expected a receipt, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_keeps_polling_until_mined() {
        let stub = StubNetwork::new().pending_for(3);
        let pending = send(&stub).await;

        let outcome = wait_for_receipt(&stub, &pending, &fast_policy()).await.unwrap();
        assert!(matches!(outcome, WaitOutcome::Mined(_)));
        assert_eq!(stub.receipt_lookups(), 4);
    }

    #[tokio::test]
    async fn test_waits_for_confirmation_depth() {
        let stub = StubNetwork::new();
        let pending = send(&stub).await;
        let policy = WaitPolicy {
            confirmations: 3,
            ..fast_policy()
        };

        let miner = stub.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            miner.mine(2);
        });

        let outcome = wait_for_receipt(&stub, &pending, &policy).await.unwrap();
        handle.await.unwrap();

        assert!(matches!(outcome, WaitOutcome::Mined(_)));
        assert!(stub.receipt_lookups() > 1);
    }

    #[tokio::test]
    async fn test_times_out_instead_of_hanging() {
        let stub = StubNetwork::new().stalled();
        let pending = send(&stub).await;
        let policy = WaitPolicy {
            max_wait: Some(Duration::from_millis(30)),
            ..fast_policy()
        };

        match wait_for_receipt(&stub, &pending, &policy).await.unwrap() {
            WaitOutcome::TimedOut { hash, waited } => {
                assert_eq!(hash, pending.hash);
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("expected a time-out, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_fault_is_receipt_wait_error() {
        let stub = StubNetwork::new().failing_receipts("connection reset by peer");
        let pending = send(&stub).await;

        let err = wait_for_receipt(&stub, &pending, &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::ReceiptWait { hash, .. } if hash == pending.hash));
        assert!(err.to_string().contains("connection reset by peer"));
    }
}
