//! Source-chain types and error definitions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Gas attached to `call_method` when the caller does not choose (30 TGas).
pub const DEFAULT_CALL_GAS: u64 = 30_000_000_000_000;

/// Deposit attached to `call_method` when the caller does not choose.
pub const DEFAULT_CALL_DEPOSIT: u128 = 0;

/// Errors that can occur during source-chain and wallet operations.
#[derive(Debug, Clone, Error)]
pub enum NearError {
    /// Transport failed before a JSON-RPC response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Well-formed JSON-RPC error response.
    #[error("RPC error {name}: {message}")]
    Rpc { name: String, message: String },

    /// A state-changing call was attempted while signed out.
    #[error("No account is signed in")]
    NotSignedIn,

    /// The user or wallet declined to sign.
    #[error("Transaction rejected by wallet: {0}")]
    TransactionRejected(String),

    /// The contract call failed on chain.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// A view call reverted or returned something that is not JSON.
    #[error("View call failed: {0}")]
    View(String),

    /// A response could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// A local input, such as the RPC URL, is malformed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No wallet connection is available for the requested action.
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),
}

/// Result type for source-chain operations.
pub type NearResult<T> = Result<T, NearError>;

/// Who is signed in. An empty id means signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub signed_account_id: String,
}

impl SessionIdentity {
    pub fn signed_in(account_id: impl Into<String>) -> Self {
        Self {
            signed_account_id: account_id.into(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !self.signed_account_id.is_empty()
    }
}

/// One entry of the wallet's account set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub account_id: String,
    pub active: bool,
}

impl WalletAccount {
    pub fn new(account_id: impl Into<String>, active: bool) -> Self {
        Self {
            account_id: account_id.into(),
            active,
        }
    }
}

/// Read-only contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    pub contract_id: String,
    pub method: String,
    pub args: Value,
}

impl ViewRequest {
    pub fn new(contract_id: impl Into<String>, method: impl Into<String>, args: Value) -> Self {
        Self {
            contract_id: contract_id.into(),
            method: method.into(),
            args,
        }
    }
}

/// State-changing contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Signer. Empty means the signed-in account.
    pub account_id: String,
    pub contract_id: String,
    pub method: String,
    pub args: Value,
    pub gas: u64,
    pub deposit: u128,
}

impl CallRequest {
    /// A call with the default gas and deposit.
    pub fn new(
        account_id: impl Into<String>,
        contract_id: impl Into<String>,
        method: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            contract_id: contract_id.into(),
            method: method.into(),
            args,
            gas: DEFAULT_CALL_GAS,
            deposit: DEFAULT_CALL_DEPOSIT,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_deposit(mut self, deposit: u128) -> Self {
        self.deposit = deposit;
        self
    }
}

/// Function call action, in the wallet's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Value,
    #[serde(with = "dec_format")]
    pub gas: u64,
    #[serde(with = "dec_format")]
    pub deposit: u128,
}

/// Transaction action handed to the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    FunctionCall(FunctionCallAction),
}

/// Transaction the wallet signs and submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<Action>,
}

/// Overall status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalExecutionStatus {
    NotStarted,
    Started,
    Failure(Value),
    /// Base64 encoded return value of the last receipt.
    SuccessValue(String),
}

impl FinalExecutionStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Failure(_) | Self::SuccessValue(_))
    }

    /// Decoded return value, or `None` while still pending.
    ///
    /// An empty success value decodes to `Value::Null`.
    pub fn last_result(&self) -> Option<NearResult<Value>> {
        match self {
            Self::NotStarted | Self::Started => None,
            Self::Failure(error) => Some(Err(NearError::Execution(error.to_string()))),
            Self::SuccessValue(encoded) => Some(decode_json_base64(encoded)),
        }
    }
}

fn decode_json_base64(encoded: &str) -> NearResult<Value> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| NearError::Decoding(format!("invalid base64 return value: {}", e)))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| NearError::Decoding(format!("return value is not JSON: {}", e)))
}

/// The signed transaction as echoed back by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub hash: String,
    pub signer_id: String,
    pub receiver_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub gas_burnt: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcomeWithId {
    pub id: String,
    #[serde(default)]
    pub outcome: ExecutionOutcome,
}

/// Result of `tx` status queries and wallet submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    pub status: FinalExecutionStatus,
    pub transaction: TransactionView,
    pub transaction_outcome: ExecutionOutcomeWithId,
    #[serde(default)]
    pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
}

impl FinalExecutionOutcome {
    /// Logs of every receipt, in execution order.
    pub fn logs(&self) -> impl Iterator<Item = &str> {
        self.receipts_outcome
            .iter()
            .flat_map(|r| r.outcome.logs.iter().map(String::as_str))
    }
}

/// Numbers the wallet protocol carries as decimal strings.
mod dec_format {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
