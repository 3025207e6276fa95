//! Destination-chain (EVM) subsystem.
//!
//! # Data Flow
//! ```text
//! ChainEndpoint (RPC URL, chain id)
//!     → client.rs (RPC round trips with timeouts)
//!     → transaction.rs (build EIP-1559 payload, attach signature, encode)
//!     → client.rs (broadcast raw transaction)
//! ```
//!
//! # Constraints
//! - No private keys live here; signatures come from the MPC service
//! - All RPC calls have configurable timeouts
//! - No retries at this layer

pub mod client;
pub mod transaction;
pub mod types;

pub use client::EvmClient;
pub use transaction::{SignedTransaction, UnsignedTransactionPayload};
pub use types::{ChainEndpoint, EvmError, GasEstimate, RelayReceipt, RelayRejection};
