use std::fmt::Write;

use alloy::primitives::{U256, utils::format_ether};

use crate::app::{DeployOutcome, InvokeOutcome, TxResult};
use crate::network::TransactionReceipt;
use crate::preflight::{PreflightReport, WalletInfo, gwei};

pub fn chain_id_to_network(chain_id: u64) -> String {
    match chain_id {
        1 => "mainnet".to_string(),
        11155111 => "sepolia".to_string(),
        17000 => "holesky".to_string(),
        137 => "polygon".to_string(),
        80002 => "polygon-amoy".to_string(),
        42161 => "arbitrum".to_string(),
        421614 => "arbitrum-sepolia".to_string(),
        10 => "optimism".to_string(),
        11155420 => "optimism-sepolia".to_string(),
        8453 => "base".to_string(),
        84532 => "base-sepolia".to_string(),
        31337 => "anvil".to_string(),
        _ => format!("chain-{}", chain_id),
    }
}

/// Block explorer for well-known chains. A configured URL wins.
pub fn explorer_base(chain_id: u64, configured: Option<&str>) -> Option<String> {
    if let Some(url) = configured {
        return Some(url.trim_end_matches('/').to_string());
    }

    let url = match chain_id {
        1 => "https://etherscan.io",
        11155111 => "https://sepolia.etherscan.io",
        8453 => "https://basescan.org",
        84532 => "https://sepolia.basescan.org",
        10 => "https://optimistic.etherscan.io",
        42161 => "https://arbiscan.io",
        137 => "https://polygonscan.com",
        _ => return None,
    };
    Some(url.to_string())
}

/// Everything the summaries need besides the outcome itself.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub chain_id: u64,
    pub explorer: Option<String>,
}

impl ReportContext {
    fn link(&self, kind: &str, id: impl std::fmt::Display) -> Option<String> {
        self.explorer
            .as_ref()
            .map(|base| format!("{}/{}/{}", base, kind, id))
    }
}

fn write_sender(out: &mut String, preflight: &PreflightReport) {
    let _ = writeln!(
        out,
        "  from:        {} ({} ETH before)",
        preflight.account,
        format_ether(preflight.balance)
    );
    let _ = writeln!(out, "  gas price:   {}", gwei(preflight.gas_price));
    if preflight.low_balance {
        let _ = writeln!(out, "  warning:     balance was below the low-funds threshold");
    }
}

fn write_receipt(out: &mut String, receipt: &TransactionReceipt) {
    let _ = writeln!(out, "  block:       {}", receipt.block_number);
    let _ = writeln!(out, "  gas used:    {}", receipt.gas_used);
    let _ = writeln!(
        out,
        "  fee:         {} ETH",
        format_ether(U256::from(receipt.fee()))
    );
}

fn write_result(out: &mut String, result: &TxResult, ctx: &ReportContext) {
    match result {
        TxResult::Confirmed(receipt) => {
            let _ = writeln!(out, "  status:      success");
            write_receipt(out, receipt);
        }
        TxResult::Reverted(receipt) => {
            let _ = writeln!(out, "  status:      REVERTED");
            write_receipt(out, receipt);
        }
        TxResult::TimedOut { hash, waited } => {
            let _ = writeln!(
                out,
                "  status:      no receipt after {}s; {} may still be mined",
                waited.as_secs(),
                hash
            );
        }
    }

    let hash = match result {
        TxResult::TimedOut { hash, .. } => *hash,
        TxResult::Confirmed(r) | TxResult::Reverted(r) => r.hash,
    };
    if let Some(link) = ctx.link("tx", hash) {
        let _ = writeln!(out, "  explorer:    {}", link);
    }
}

pub fn deploy_summary(outcome: &DeployOutcome, ctx: &ReportContext) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Deployment of {} on {}",
        outcome.artifact,
        chain_id_to_network(ctx.chain_id)
    );
    write_sender(&mut out, &outcome.preflight);
    let _ = writeln!(out, "  tx hash:     {}", outcome.pending.hash);

    if let Some(address) = outcome.contract_address() {
        let _ = writeln!(out, "  address:     {}", address.to_checksum(None));
        if let Some(link) = ctx.link("address", address) {
            let _ = writeln!(out, "  contract:    {}", link);
        }
    }
    write_result(&mut out, &outcome.result, ctx);

    if let Some((key, value)) = &outcome.persisted {
        let _ = writeln!(out, "  saved:       {}={}", key, value);
    }
    if let Some(warning) = &outcome.persistence_warning {
        let _ = writeln!(out, "  warning:     {}", warning);
    }
    out
}

pub fn invoke_summary(outcome: &InvokeOutcome, ctx: &ReportContext) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Call {} on {}",
        outcome.function,
        chain_id_to_network(ctx.chain_id)
    );
    write_sender(&mut out, &outcome.preflight);
    let _ = writeln!(out, "  tx hash:     {}", outcome.pending.hash);
    write_result(&mut out, &outcome.result, ctx);

    if let Some(receipt) = outcome.result.receipt() {
        for (i, log) in receipt.logs.iter().enumerate() {
            let topics = if log.topics.is_empty() {
                "anonymous".to_string()
            } else {
                log.topics
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let _ = writeln!(out, "  log {}:       {} from {}", i, topics, log.address);
        }
    }

    if let Some((name, values)) = &outcome.read_back {
        let _ = writeln!(out, "  {}():  {}", name, values.join(", "));
    }
    out
}

pub fn wallet_summary(info: &WalletInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Wallet {}", info.address.to_checksum(None));
    let _ = writeln!(
        out,
        "  network:     {} (chain {})",
        chain_id_to_network(info.chain_id),
        info.chain_id
    );
    let _ = writeln!(out, "  block:       {}", info.block_number);
    let _ = writeln!(out, "  balance:     {} ETH", format_ether(info.balance));
    let _ = writeln!(out, "  next nonce:  {}", info.pending_nonce);
    if info.low_balance {
        let _ = writeln!(out, "  warning:     balance is low; top up from a faucet");
    }
    out
}
