//! In-memory network used by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::{
    primitives::{Address, B256, Bytes, TxHash, TxKind, U256, keccak256},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;

use super::{EventLog, ReadClient, ReceiptStatus, RpcError, TransactionReceipt, WriteClient};

/// What the stub does with every accepted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubOutcome {
    Success,
    Revert,
}

#[derive(Clone)]
pub struct StubNetwork {
    state: Arc<Mutex<StubState>>,
}

struct StubState {
    account: Address,
    chain_id: u64,
    balance: U256,
    gas_price: u128,
    block_number: u64,
    outcome: StubOutcome,
    contract_address: Address,
    call_result: Bytes,
    send_error: Option<String>,
    receipt_error: Option<String>,
    /// Receipt lookups answered with `None` before the receipt shows up.
    pending_polls: u32,
    /// Never produce a receipt at all.
    stalled: bool,
    nonce: u64,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    receipt_lookups: u32,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                account: Address::repeat_byte(0x11),
                chain_id: 31337,
                balance: U256::from(10u64).pow(U256::from(18u64)),
                gas_price: 1_000_000_000,
                block_number: 100,
                outcome: StubOutcome::Success,
                contract_address: Address::repeat_byte(0xcc),
                call_result: Bytes::new(),
                send_error: None,
                receipt_error: None,
                pending_polls: 0,
                stalled: false,
                nonce: 0,
                sent: Vec::new(),
                receipts: HashMap::new(),
                receipt_lookups: 0,
            })),
        }
    }

    fn update(self, f: impl FnOnce(&mut StubState)) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            f(&mut *state);
        }
        self
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.update(|s| s.chain_id = chain_id)
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.update(|s| s.balance = balance)
    }

    pub fn with_outcome(self, outcome: StubOutcome) -> Self {
        self.update(|s| s.outcome = outcome)
    }

    pub fn with_contract_address(self, address: Address) -> Self {
        self.update(|s| s.contract_address = address)
    }

    pub fn with_call_result(self, data: Bytes) -> Self {
        self.update(|s| s.call_result = data)
    }

    pub fn failing_send(self, message: &str) -> Self {
        let message = message.to_string();
        self.update(|s| s.send_error = Some(message))
    }

    pub fn failing_receipts(self, message: &str) -> Self {
        let message = message.to_string();
        self.update(|s| s.receipt_error = Some(message))
    }

    pub fn pending_for(self, polls: u32) -> Self {
        self.update(|s| s.pending_polls = polls)
    }

    pub fn stalled(self) -> Self {
        self.update(|s| s.stalled = true)
    }

    pub fn account(&self) -> Address {
        self.state.lock().unwrap().account
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn receipt_lookups(&self) -> u32 {
        self.state.lock().unwrap().receipt_lookups
    }

    /// Advance the chain head, e.g. to add confirmations.
    pub fn mine(&self, blocks: u64) {
        self.state.lock().unwrap().block_number += blocks;
    }
}

#[async_trait]
impl ReadClient for StubNetwork {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(self.state.lock().unwrap().chain_id)
    }

    async fn balance(&self, _address: Address) -> Result<U256, RpcError> {
        Ok(self.state.lock().unwrap().balance)
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        Ok(self.state.lock().unwrap().block_number)
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64, RpcError> {
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, RpcError> {
        Ok(self.state.lock().unwrap().call_result.clone())
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_lookups += 1;

        if let Some(message) = &state.receipt_error {
            return Err(RpcError::new("eth_getTransactionReceipt", message));
        }
        if state.stalled {
            return Ok(None);
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            return Ok(None);
        }
        Ok(state.receipts.get(&hash).cloned())
    }
}

#[async_trait]
impl WriteClient for StubNetwork {
    fn address(&self) -> Address {
        self.state.lock().unwrap().account
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, RpcError> {
        let mut state = self.state.lock().unwrap();

        if let Some(message) = &state.send_error {
            return Err(RpcError::new("eth_sendRawTransaction", message));
        }

        let nonce = request.nonce.unwrap_or(state.nonce);
        state.nonce = state.nonce.max(nonce + 1);
        state.block_number += 1;

        let hash = keccak256([nonce.to_be_bytes(), (state.sent.len() as u64).to_be_bytes()].concat());
        let is_create = matches!(request.to, Some(TxKind::Create));
        let success = state.outcome == StubOutcome::Success;

        let logs = match request.to {
            Some(TxKind::Call(to)) if success => vec![EventLog {
                address: to,
                topics: vec![B256::repeat_byte(0xee)],
                data: Bytes::new(),
            }],
            _ => Vec::new(),
        };

        let receipt = TransactionReceipt {
            hash,
            status: if success {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Failure
            },
            contract_address: (is_create && success).then_some(state.contract_address),
            gas_used: if is_create { 500_000 } else { 45_000 },
            effective_gas_price: state.gas_price,
            block_number: state.block_number,
            logs,
        };

        state.receipts.insert(hash, receipt);
        state.sent.push(request);

        Ok(hash)
    }
}
