//! Cross-chain signing relayer library.
//!
//! A NEAR account drives an EVM account through the MPC signer contract:
//! build an EIP-1559 payload, have the MPC network sign its digest through a
//! wallet-submitted `sign` call, then broadcast the signed transaction.

// Chains
pub mod evm;
pub mod near;
pub mod mpc;

// Signing flow
pub mod pipeline;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::schema::RelayerConfig;
pub use near::SessionBroker;
pub use pipeline::{ErrorKind, PipelineError, PipelineReporter, TransactionPipeline};
