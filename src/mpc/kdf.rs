//! Child key derivation for MPC signing paths.
//!
//! # Data Flow
//! ```text
//! "secp256k1:<bs58>" ──► root point P
//! predecessor, path  ──► sha3-256(prefix ‖ predecessor ‖ "," ‖ path) ──► ε
//! child = ε·G + P ──► keccak256(uncompressed child)[12..] ──► EVM address
//! ```
//! The child secret is never materialized; only the MPC network can sign for it.

use alloy::primitives::Address;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, PublicKey, Scalar};
use sha3::{Digest, Sha3_256};

use crate::mpc::types::{MpcError, MpcResult};

const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";
const SECP256K1_KEY_PREFIX: &str = "secp256k1:";

/// Tweak scalar for `predecessor`'s key at `path`.
pub fn derive_epsilon(predecessor: &str, path: &str) -> MpcResult<Scalar> {
    let mut hasher = Sha3_256::new();
    hasher.update(format!("{EPSILON_DERIVATION_PREFIX}{predecessor},{path}"));
    let hash: [u8; 32] = hasher.finalize().into();
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(hash))).ok_or_else(|| {
        MpcError::InvalidPublicKey(format!(
            "epsilon for {predecessor},{path} is outside the scalar field"
        ))
    })
}

/// Parse the contract's `public_key` view result.
///
/// Accepts `secp256k1:` followed by base58 of the 64-byte uncompressed key
/// without its SEC1 tag, or hex SEC1 bytes.
pub fn parse_root_public_key(encoded: &str) -> MpcResult<PublicKey> {
    let bytes = match encoded.strip_prefix(SECP256K1_KEY_PREFIX) {
        Some(body) => bs58::decode(body)
            .into_vec()
            .map_err(|e| MpcError::InvalidPublicKey(format!("bad base58: {}", e)))?,
        None => alloy::primitives::hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| MpcError::InvalidPublicKey(format!("unrecognized key encoding: {}", e)))?,
    };

    let sec1 = if bytes.len() == 64 {
        let mut tagged = Vec::with_capacity(65);
        tagged.push(0x04);
        tagged.extend_from_slice(&bytes);
        tagged
    } else {
        bytes
    };

    PublicKey::from_sec1_bytes(&sec1)
        .map_err(|e| MpcError::InvalidPublicKey(format!("not a secp256k1 point: {}", e)))
}

/// Child public key `ε·G + root`.
pub fn derive_public_key(root: &PublicKey, epsilon: Scalar) -> MpcResult<PublicKey> {
    let child = ProjectivePoint::GENERATOR * epsilon + root.to_projective();
    PublicKey::from_affine(child.to_affine())
        .map_err(|_| MpcError::InvalidPublicKey("derived key is the identity point".to_string()))
}

/// EVM address of a secp256k1 public key.
pub fn public_key_to_address(key: &PublicKey) -> Address {
    let encoded = key.to_encoded_point(false);
    Address::from_raw_public_key(&encoded.as_bytes()[1..])
}

/// EVM address controlled by `predecessor` at `path` under `root`.
pub fn derive_eth_address(root: &PublicKey, predecessor: &str, path: &str) -> MpcResult<Address> {
    let epsilon = derive_epsilon(predecessor, path)?;
    let child = derive_public_key(root, epsilon)?;
    Ok(public_key_to_address(&child))
}
