//! MPC signer contract types.

use alloy::primitives::B256;
use serde_json::{json, Value};
use thiserror::Error;

/// Contract method that queues a signature request.
pub const SIGN_METHOD: &str = "sign";

/// Contract view returning the root public key.
pub const PUBLIC_KEY_METHOD: &str = "public_key";

/// Errors produced while talking to the MPC signer contract.
#[derive(Debug, Clone, Error)]
pub enum MpcError {
    /// The contract's response does not contain a usable signature.
    #[error("Cannot decode MPC signature: {0}")]
    Decoding(String),

    /// The root public key is malformed or derivation produced the identity point.
    #[error("Invalid MPC public key: {0}")]
    InvalidPublicKey(String),
}

/// Result type for MPC operations.
pub type MpcResult<T> = Result<T, MpcError>;

/// A request for the MPC service to sign `payload` with the key at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpcSignatureRequest {
    pub path: String,
    pub payload: B256,
    pub key_version: u32,
    /// Account the request is signed by. The derived key depends on it.
    pub signer_account: String,
}

impl MpcSignatureRequest {
    /// Arguments for the contract's `sign` method.
    pub fn to_args(&self) -> Value {
        json!({
            "request": {
                "payload": self.payload.0.to_vec(),
                "path": self.path,
                "key_version": self.key_version,
            }
        })
    }
}
