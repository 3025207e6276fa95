//! Fee-market transaction assembly and encoding.
//!
//! # Responsibilities
//! - Parse caller input (addresses, hex calldata)
//! - Build EIP-1559 transactions and their signing digest
//! - Attach an externally produced signature
//! - EIP-2718 encode/decode signed transactions for broadcast

use alloy::consensus::{SignableTransaction, Signed, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::primitives::{hex, Address, Bytes, TxKind, B256, U256};
use alloy::signers::Signature;
use serde::{Deserialize, Serialize};

use crate::evm::types::{EvmError, EvmResult, GasEstimate};

/// Gas limit used when the config does not override it.
pub const DEFAULT_GAS_LIMIT: u64 = 50_000;

/// A signed fee-market transaction, ready for EIP-2718 encoding.
pub type SignedTransaction = Signed<TxEip1559>;

/// Unsigned transaction plus the digest the MPC service must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransactionPayload {
    pub transaction: TxEip1559,
    pub digest: B256,
}

/// Parse a `0x` prefixed address.
pub fn parse_address(field: &str, value: &str) -> EvmResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| EvmError::Encoding(format!("Invalid {} address '{}': {}", field, value, e)))
}

/// Parse hex calldata. Empty input and a bare `0x` mean no calldata.
pub fn parse_calldata(data: &str) -> EvmResult<Bytes> {
    let trimmed = data.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() {
        return Ok(Bytes::new());
    }
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| EvmError::Encoding(format!("Invalid hex data '{}': {}", data, e)))
}

fn fee_to_u128(field: &str, value: U256) -> EvmResult<u128> {
    u128::try_from(value)
        .map_err(|_| EvmError::Encoding(format!("{} {} does not fit in 128 bits", field, value)))
}

/// Assemble an EIP-1559 transaction and compute its signing digest.
///
/// Pure: identical inputs always give a byte-identical digest.
pub fn build_payload(
    chain_id: u64,
    nonce: u64,
    gas_limit: u64,
    gas: &GasEstimate,
    to: Address,
    value: U256,
    input: Bytes,
) -> EvmResult<UnsignedTransactionPayload> {
    let transaction = TxEip1559 {
        chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas: fee_to_u128("maxFeePerGas", gas.max_fee_per_gas)?,
        max_priority_fee_per_gas: fee_to_u128(
            "maxPriorityFeePerGas",
            gas.max_priority_fee_per_gas,
        )?,
        to: TxKind::Call(to),
        value,
        input,
        ..Default::default()
    };
    let digest = transaction.signature_hash();

    Ok(UnsignedTransactionPayload {
        transaction,
        digest,
    })
}

/// Attach a signature to an unsigned transaction.
pub fn attach_signature(transaction: TxEip1559, signature: Signature) -> SignedTransaction {
    transaction.into_signed(signature)
}

/// EIP-2718 wire encoding (`0x02 || rlp(...)`).
pub fn encode_signed(signed: &SignedTransaction) -> Vec<u8> {
    TxEnvelope::from(signed.clone()).encoded_2718()
}

/// Decode a raw signed fee-market transaction.
pub fn decode_signed(raw: &[u8]) -> EvmResult<SignedTransaction> {
    let mut buf = raw;
    match TxEnvelope::decode_2718(&mut buf) {
        Ok(TxEnvelope::Eip1559(signed)) => Ok(signed),
        Ok(other) => Err(EvmError::Encoding(format!(
            "Unsupported transaction type {:?}",
            other.tx_type()
        ))),
        Err(e) => Err(EvmError::Encoding(format!("Invalid raw transaction: {}", e))),
    }
}
