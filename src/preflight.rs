use alloy::primitives::{
    Address, U256,
    utils::{format_ether, format_units},
};

use crate::error::DeployError;
use crate::network::ReadClient;

/// Balances below 0.001 of the native unit get a low-funds advisory.
pub const LOW_BALANCE_THRESHOLD_WEI: u128 = 1_000_000_000_000_000;

/// Balance and gas price observed right before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub account: Address,
    pub balance: U256,
    /// Gas price in wei; only meaningful for the submission that follows.
    pub gas_price: u128,
    /// Advisory only: submission is still attempted.
    pub low_balance: bool,
}

pub fn is_low_balance(balance: U256) -> bool {
    balance < U256::from(LOW_BALANCE_THRESHOLD_WEI)
}

/// Fetch balance and gas price. A low balance is reported, never rejected;
/// the node decides whether the funds are really insufficient.
pub async fn check(read: &dyn ReadClient, account: Address) -> Result<PreflightReport, DeployError> {
    let balance = read
        .balance(account)
        .await
        .map_err(|source| DeployError::Query {
            context: format!("failed to fetch balance of {}", account),
            source,
        })?;

    let low_balance = is_low_balance(balance);
    tracing::info!("Balance of {}: {} ETH", account, format_ether(balance));
    if low_balance {
        tracing::warn!(
            "Balance is below {} ETH; the transaction may fail. Top up from a faucet if it does.",
            format_ether(U256::from(LOW_BALANCE_THRESHOLD_WEI))
        );
    }

    let gas_price = read.gas_price().await.map_err(|source| DeployError::Query {
        context: "failed to fetch gas price".to_string(),
        source,
    })?;

    tracing::info!(
        "Gas price: {} ({} ETH per 1M gas)",
        gwei(gas_price),
        format_ether(U256::from(gas_price) * U256::from(1_000_000u64))
    );

    Ok(PreflightReport {
        account,
        balance,
        gas_price,
        low_balance,
    })
}

/// Account overview for the `wallet` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub address: Address,
    pub chain_id: u64,
    pub block_number: u64,
    pub balance: U256,
    pub low_balance: bool,
    pub pending_nonce: u64,
}

pub async fn inspect_wallet(read: &dyn ReadClient, address: Address) -> Result<WalletInfo, DeployError> {
    let query = |context: &str| {
        let context = context.to_string();
        move |source| DeployError::Query { context, source }
    };

    let chain_id = read.chain_id().await.map_err(query("failed to fetch chain id"))?;
    let block_number = read
        .block_number()
        .await
        .map_err(query("failed to fetch block number"))?;
    let balance = read
        .balance(address)
        .await
        .map_err(query("failed to fetch balance"))?;
    let pending_nonce = read
        .pending_nonce(address)
        .await
        .map_err(query("failed to fetch nonce"))?;

    Ok(WalletInfo {
        address,
        chain_id,
        block_number,
        balance,
        low_balance: is_low_balance(balance),
        pending_nonce,
    })
}

/// Gas price for display, e.g. `1.500000000 gwei`.
pub fn gwei(wei: u128) -> String {
    format_units(U256::from(wei), "gwei")
        .map(|units| format!("{} gwei", units))
        .unwrap_or_else(|_| format!("{} wei", wei))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::stub::StubNetwork;

    /// Micro-ether, 10^12 wei each.
    fn eth_micro(micro: u64) -> U256 {
        U256::from(micro) * U256::from(1_000_000_000_000u64)
    }

    #[tokio::test]
    async fn test_low_balance_boundary() {
        for (balance, expected) in [
            (eth_micro(900), true),   // 0.0009
            (eth_micro(1000), false), // 0.0010
            (eth_micro(1100), false), // 0.0011
        ] {
            let stub = StubNetwork::new().with_balance(balance);
            let report = check(&stub, stub.account()).await.unwrap();
            assert_eq!(report.low_balance, expected, "balance {}", balance);
            assert_eq!(report.balance, balance);
        }
    }

    #[tokio::test]
    async fn test_zero_balance_is_advisory_not_error() {
        let stub = StubNetwork::new().with_balance(U256::ZERO);
        let report = check(&stub, stub.account()).await.unwrap();
        assert!(report.low_balance);
        assert_eq!(report.gas_price, 1_000_000_000);
    }

    #[tokio::test]
    async fn test_inspect_wallet() {
        let stub = StubNetwork::new().with_chain_id(84532);
        let info = inspect_wallet(&stub, stub.account()).await.unwrap();
        assert_eq!(info.chain_id, 84532);
        assert_eq!(info.block_number, 100);
        assert_eq!(info.pending_nonce, 0);
        assert!(!info.low_balance);
    }

    #[test]
    fn test_gwei() {
        assert_eq!(gwei(1_000_000_000), "1.000000000 gwei");
        assert_eq!(gwei(1_500_000_000), "1.500000000 gwei");
        assert_eq!(gwei(1_000_001), "0.001000001 gwei");
    }
}
