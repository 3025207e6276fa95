//! Decoding of MPC contract signature responses.
//!
//! The contract answers `sign` with one of:
//! ```text
//! {"big_r": {"affine_point": "02..."}, "s": {"scalar": "..."}, "recovery_id": 0}
//! {"r": "...", "s": "...", "v": 27}     (relayed results, v may be 0/1, 27/28 or EIP-155)
//! ["02...", "..."]                      (older deployments, no recovery id)
//! ```
//! `big_r` is a compressed SEC1 point; its x coordinate is the ECDSA `r`.

use alloy::primitives::{hex, B256, U256};
use alloy::signers::Signature;
use serde::Deserialize;
use serde_json::Value;

use crate::mpc::types::{MpcError, MpcResult};

#[derive(Debug, Deserialize)]
struct AffinePoint {
    affine_point: String,
}

#[derive(Debug, Deserialize)]
struct Scalar {
    scalar: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignatureResponse {
    Structured {
        big_r: AffinePoint,
        s: Scalar,
        recovery_id: u64,
    },
    Flat {
        r: String,
        s: String,
        #[serde(alias = "recovery_id", alias = "recoveryId")]
        v: u64,
    },
    Legacy(String, String),
}

/// ECDSA signature returned by the MPC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpcSignature {
    pub r: B256,
    pub s: B256,
    /// y parity reported by the service, if any.
    pub recovery_id: Option<u8>,
}

impl MpcSignature {
    /// Decode a contract return value.
    pub fn from_value(value: &Value) -> MpcResult<Self> {
        let response = SignatureResponse::deserialize(value)
            .map_err(|e| MpcError::Decoding(format!("unexpected response shape {}: {}", value, e)))?;

        match response {
            SignatureResponse::Structured {
                big_r,
                s,
                recovery_id,
            } => {
                let (r, _) = parse_big_r(&big_r.affine_point)?;
                Ok(Self {
                    r,
                    s: parse_scalar(&s.scalar)?,
                    recovery_id: Some(normalize_recovery_id(recovery_id)?),
                })
            }
            SignatureResponse::Flat { r, s, v } => {
                let (r, _) = parse_big_r(&r)?;
                Ok(Self {
                    r,
                    s: parse_scalar(&s)?,
                    recovery_id: Some(normalize_recovery_id(v)?),
                })
            }
            SignatureResponse::Legacy(big_r, s) => {
                let (r, parity_hint) = parse_big_r(&big_r)?;
                Ok(Self {
                    r,
                    s: parse_scalar(&s)?,
                    recovery_id: parity_hint,
                })
            }
        }
    }

    /// Signatures to try, most likely parity first.
    pub fn candidates(&self) -> [Signature; 2] {
        let r = U256::from_be_bytes(self.r.0);
        let s = U256::from_be_bytes(self.s.0);
        let first = self.recovery_id.unwrap_or(0) == 1;
        [Signature::new(r, s, first), Signature::new(r, s, !first)]
    }
}

/// Map 0/1, 27/28 and EIP-155 `v` values to a y parity bit.
pub fn normalize_recovery_id(v: u64) -> MpcResult<u8> {
    match v {
        0 | 1 => Ok(v as u8),
        27 | 28 => Ok((v - 27) as u8),
        v if v >= 35 => Ok(((v - 35) % 2) as u8),
        v => Err(MpcError::Decoding(format!("unsupported recovery id {}", v))),
    }
}

/// Returns `r` and, for compressed points, the parity encoded in the prefix.
/// A bare 32-byte value is taken as `r` itself.
fn parse_big_r(encoded: &str) -> MpcResult<(B256, Option<u8>)> {
    let bytes = decode_hex("big_r", encoded)?;
    match bytes.as_slice() {
        [prefix @ (0x02 | 0x03), x @ ..] if x.len() == 32 => {
            Ok((B256::from_slice(x), Some(prefix - 0x02)))
        }
        x if x.len() == 32 => Ok((B256::from_slice(x), None)),
        _ => Err(MpcError::Decoding(format!(
            "big_r must be a 33-byte compressed point, got {} bytes",
            bytes.len()
        ))),
    }
}

fn parse_scalar(encoded: &str) -> MpcResult<B256> {
    let bytes = decode_hex("s", encoded)?;
    if bytes.is_empty() || bytes.len() > 32 {
        return Err(MpcError::Decoding(format!(
            "s must be at most 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(B256::from(padded))
}

fn decode_hex(field: &str, encoded: &str) -> MpcResult<Vec<u8>> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    hex::decode(digits).map_err(|e| MpcError::Decoding(format!("{} is not hex: {}", field, e)))
}
