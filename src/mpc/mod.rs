//! MPC signer contract integration.
//!
//! # Data Flow
//! ```text
//! digest ──► MpcSignatureRequest::to_args ──► SessionBroker::call_method("sign")
//!                                                        │
//! MpcSignature::from_value ◄── SuccessValue ◄────────────┘
//!        │
//!        └──► candidates() ──► recover against sender ──► signed transaction
//! ```
//!
//! `kdf` reproduces the contract's key derivation so the EVM sender address of
//! a NEAR account and path can be computed locally.

pub mod kdf;
pub mod signature;
pub mod types;

pub use kdf::{derive_eth_address, derive_epsilon, parse_root_public_key};
pub use signature::MpcSignature;
pub use types::{MpcError, MpcResult, MpcSignatureRequest, PUBLIC_KEY_METHOD, SIGN_METHOD};
