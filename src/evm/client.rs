//! Destination-chain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint
//! - Query chain state (chain id, balances, nonces, fee market, receipts)
//! - Broadcast raw signed transactions
//! - Map transport failures and JSON-RPC errors to `EvmError`
//!
//! Every method is a single round trip. Retry policy belongs to the caller.

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::transports::TransportResult;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::evm::types::{ChainEndpoint, EvmError, EvmResult, GasEstimate};

/// Default per-request timeout.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Destination-chain RPC client bound to one endpoint.
#[derive(Clone)]
pub struct EvmClient {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: ChainEndpoint,
    timeout_secs: u64,
}

impl EvmClient {
    /// Create a client without touching the network.
    pub fn new(endpoint: ChainEndpoint, timeout_secs: u64) -> Self {
        let provider = ProviderBuilder::new().connect_http(endpoint.rpc_url.clone());
        Self {
            provider: Arc::new(provider),
            endpoint,
            timeout_secs,
        }
    }

    /// Create a client and check that the node serves the expected chain.
    ///
    /// Unlike [`EvmClient::new`] this fails if the endpoint is unreachable.
    pub async fn connect(endpoint: ChainEndpoint, timeout_secs: u64) -> EvmResult<Self> {
        let client = Self::new(endpoint, timeout_secs);
        client.verify_chain_id().await?;
        tracing::info!(
            rpc_url = %client.endpoint.rpc_url,
            chain_id = client.endpoint.chain_id,
            "EVM client connected"
        );
        Ok(client)
    }

    /// Verify the connected chain ID matches the endpoint.
    pub async fn verify_chain_id(&self) -> EvmResult<()> {
        let actual = self.get_chain_id().await?;
        if actual != self.endpoint.chain_id {
            return Err(EvmError::ChainMismatch {
                expected: self.endpoint.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> EvmResult<u64> {
        self.request("eth_chainId", self.provider.get_chain_id()).await
    }

    /// Get the balance of an address in wei.
    pub async fn get_balance(&self, address: Address) -> EvmResult<U256> {
        self.request("eth_getBalance", self.provider.get_balance(address))
            .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> EvmResult<u64> {
        self.request(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    /// Current fee market: `eth_gasPrice` as the fee cap, `eth_maxPriorityFeePerGas` as the tip.
    pub async fn query_gas_price(&self) -> EvmResult<GasEstimate> {
        let max_fee = self.request("eth_gasPrice", self.provider.get_gas_price()).await?;
        let priority_fee = self
            .request(
                "eth_maxPriorityFeePerGas",
                self.provider.get_max_priority_fee_per_gas(),
            )
            .await?;

        tracing::debug!(
            max_fee_per_gas = max_fee,
            max_priority_fee_per_gas = priority_fee,
            "Gas price queried"
        );

        Ok(GasEstimate {
            max_fee_per_gas: U256::from(max_fee),
            max_priority_fee_per_gas: U256::from(priority_fee),
        })
    }

    /// Broadcast an EIP-2718 encoded signed transaction.
    ///
    /// Node rejections come back as `EvmError::Rpc`; classification happens in the pipeline.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> EvmResult<B256> {
        let pending = self
            .request(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> EvmResult<Option<TransactionReceipt>> {
        self.request(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await
    }

    /// Get the endpoint this client is bound to.
    pub fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    /// Get the chain ID this client signs for.
    pub fn chain_id(&self) -> u64 {
        self.endpoint.chain_id
    }

    async fn request<T, F>(&self, method: &'static str, call: F) -> EvmResult<T>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(method, error = %e, "RPC error");
                Err(match e.as_error_resp() {
                    Some(payload) => EvmError::Rpc {
                        code: payload.code,
                        message: payload.message.to_string(),
                    },
                    None => EvmError::Network(format!("{}: {}", method, e)),
                })
            }
            Err(_) => {
                tracing::warn!(method, "RPC timeout");
                Err(EvmError::Timeout(self.timeout_secs))
            }
        }
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("rpc_url", &self.endpoint.rpc_url.as_str())
            .field("chain_id", &self.endpoint.chain_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
