//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relayer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relayer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayerConfig {
    /// Destination chain (EVM) settings.
    pub evm: EvmConfig,

    /// Source chain (NEAR) settings.
    pub near: NearConfig,

    /// MPC signer contract settings.
    pub mpc: MpcConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Destination chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvmConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID (e.g., 11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas limit for built transactions.
    pub gas_limit: u64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc2.sepolia.org".to_string(),
            chain_id: 11155111,
            rpc_timeout_secs: 10,
            gas_limit: 50_000,
        }
    }
}

/// Source chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NearConfig {
    /// Network name (testnet, mainnet).
    pub network_id: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Contract the wallet sign-in flow creates an access key for.
    pub create_access_key_for: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Base delay between transaction status polls in milliseconds.
    pub poll_base_delay_ms: u64,

    /// Maximum delay between transaction status polls in milliseconds.
    pub poll_max_delay_ms: u64,
}

impl Default for NearConfig {
    fn default() -> Self {
        Self {
            network_id: "testnet".to_string(),
            rpc_url: "https://rpc.testnet.near.org".to_string(),
            create_access_key_for: "v1.signer-prod.testnet".to_string(),
            rpc_timeout_secs: 30,
            poll_base_delay_ms: 500,
            poll_max_delay_ms: 5_000,
        }
    }
}

/// MPC signer contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MpcConfig {
    /// Account id of the MPC signer contract.
    pub contract_id: String,

    /// Gas attached to `sign` calls.
    pub sign_gas: u64,

    /// Deposit attached to `sign` calls, in yoctoNEAR.
    pub sign_deposit: u128,

    /// Root key version the contract signs with.
    pub key_version: u32,

    /// Default derivation path.
    pub derivation_path: String,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            contract_id: "v1.signer-prod.testnet".to_string(),
            sign_gas: 250_000_000_000_000,
            sign_deposit: 1,
            key_version: 0,
            derivation_path: "ethereum-1".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
