use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt as RpcReceipt, TransactionRequest},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;

use super::{
    Account, EventLog, ReadClient, ReceiptStatus, RpcError, TransactionReceipt, WriteClient,
};

/// Query client backed by an Alloy HTTP provider.
pub struct AlloyReadClient {
    provider: DynProvider,
}

impl AlloyReadClient {
    pub fn connect(url: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Self { provider }
    }
}

#[async_trait]
impl ReadClient for AlloyReadClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| RpcError::new("eth_chainId", e))
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| RpcError::new("eth_getBalance", e))
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| RpcError::new("eth_gasPrice", e))
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| RpcError::new("eth_blockNumber", e))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| RpcError::new("eth_getTransactionCount", e))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default().to(to).input(input.into());

        self.provider
            .call(tx)
            .await
            .map_err(|e| RpcError::new("eth_call", e))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| RpcError::new("eth_getTransactionReceipt", e))?;

        Ok(receipt.and_then(convert_receipt))
    }
}

/// Signing client; the provider's wallet fills nonce, gas and chain id.
pub struct AlloyWriteClient {
    provider: DynProvider,
    address: Address,
}

impl AlloyWriteClient {
    pub fn connect(url: Url, account: &Account) -> Self {
        let wallet = EthereumWallet::from(account.signer().clone());

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url)
            .erased();

        Self {
            provider,
            address: account.address(),
        }
    }
}

#[async_trait]
impl WriteClient for AlloyWriteClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, RpcError> {
        tracing::debug!(
            "Sending transaction: to={:?}, value={:?}, data_len={}, nonce={:?}",
            request.to,
            request.value,
            request.input.input().map(|d| d.len()).unwrap_or(0),
            request.nonce
        );

        let pending_tx = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| RpcError::new("eth_sendRawTransaction", e))?;

        Ok(*pending_tx.tx_hash())
    }
}

/// Receipts without a block number belong to pending blocks and are skipped.
fn convert_receipt(receipt: RpcReceipt) -> Option<TransactionReceipt> {
    let block_number = receipt.block_number?;

    let status = if receipt.status() {
        ReceiptStatus::Success
    } else {
        ReceiptStatus::Failure
    };

    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| EventLog {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.inner.data.data.clone(),
        })
        .collect();

    Some(TransactionReceipt {
        hash: receipt.transaction_hash,
        status,
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        block_number,
        logs,
    })
}
