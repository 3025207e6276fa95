//! Destination-chain types and error definitions.

use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

// Re-export EvmConfig from config module to avoid duplication
pub use crate::config::schema::EvmConfig;

/// The destination-chain network the pipeline talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEndpoint {
    /// JSON-RPC endpoint URL.
    pub rpc_url: Url,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

impl ChainEndpoint {
    /// Build an endpoint from a URL string.
    pub fn parse(rpc_url: &str, chain_id: u64) -> EvmResult<Self> {
        let rpc_url = rpc_url
            .parse()
            .map_err(|e| EvmError::Encoding(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        Ok(Self { rpc_url, chain_id })
    }
}

impl TryFrom<&EvmConfig> for ChainEndpoint {
    type Error = EvmError;

    fn try_from(config: &EvmConfig) -> EvmResult<Self> {
        Self::parse(&config.rpc_url, config.chain_id)
    }
}

/// Fee-market gas estimate, in wei.
///
/// Fetched per request. Never cache one of these across payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl GasEstimate {
    /// Build an estimate from gwei amounts.
    pub fn from_gwei(max_fee_gwei: u64, max_priority_fee_gwei: u64) -> Self {
        let gwei = U256::from(1_000_000_000u64);
        Self {
            max_fee_per_gas: U256::from(max_fee_gwei) * gwei,
            max_priority_fee_per_gas: U256::from(max_priority_fee_gwei) * gwei,
        }
    }
}

/// Hash returned by the node once it accepts a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReceipt {
    pub tx_hash: B256,
}

/// Why a node refused a raw transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRejection {
    /// The sender's nonce has moved past this transaction.
    NonceTooLow,
    /// Fees are below what the node will accept or replace with.
    Underpriced,
    /// Balance does not cover value + max fee.
    InsufficientFunds,
    /// The node already has this exact transaction.
    AlreadyKnown,
    Other,
}

impl RelayRejection {
    /// Classify a node error message.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        if msg.contains("nonce too low") || msg.contains("nonce is too low") {
            Self::NonceTooLow
        } else if msg.contains("underpriced") || msg.contains("fee too low") || msg.contains("max fee per gas less than block base fee") {
            Self::Underpriced
        } else if msg.contains("insufficient funds") {
            Self::InsufficientFunds
        } else if msg.contains("already known") || msg.contains("known transaction") || msg.contains("already imported") {
            Self::AlreadyKnown
        } else {
            Self::Other
        }
    }

    /// Whether a rebuilt transaction (fresh nonce or fees) can succeed.
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, Self::NonceTooLow | Self::Underpriced | Self::AlreadyKnown)
    }
}

/// Errors that can occur during destination-chain operations.
#[derive(Debug, Clone, Error)]
pub enum EvmError {
    /// Transport failed before a JSON-RPC response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Well-formed JSON-RPC error response.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Broadcast refused by the node.
    #[error("Relay rejected ({kind:?}): {message}")]
    RelayRejected { kind: RelayRejection, message: String },

    /// Malformed caller input (address, hex data, raw transaction).
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for destination-chain operations.
pub type EvmResult<T> = Result<T, EvmError>;
