//! Source-chain JSON-RPC client.
//!
//! # Responsibilities
//! - `query` / `call_function` views at `optimistic` finality
//! - `tx` status lookups
//! - Map transport failures and JSON-RPC errors to `NearError`
//!
//! Every method is a single round trip. Retry policy belongs to the caller.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config::NearConfig;
use crate::near::types::{FinalExecutionOutcome, NearError, NearResult};

/// Raw `call_function` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallFunctionResult {
    /// Return value bytes.
    #[serde(default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    /// Older nodes report contract panics here instead of as an RPC error.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub block_height: u64,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    name: Option<String>,
    cause: Option<JsonRpcErrorCause>,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorCause {
    name: String,
    #[serde(default)]
    info: Value,
}

impl From<JsonRpcErrorObject> for NearError {
    fn from(error: JsonRpcErrorObject) -> Self {
        let name = error
            .cause
            .as_ref()
            .map(|c| c.name.clone())
            .or(error.name)
            .unwrap_or_else(|| error.code.to_string());
        let message = match (error.data, error.cause) {
            (Some(Value::String(data)), _) => data,
            (_, Some(cause)) if !cause.info.is_null() => {
                format!("{}: {}", error.message, cause.info)
            }
            _ => error.message,
        };
        NearError::Rpc { name, message }
    }
}

/// JSON-RPC client for one source-chain node.
#[derive(Debug, Clone)]
pub struct NearRpcClient {
    http: reqwest::Client,
    url: Url,
    timeout_secs: u64,
}

impl NearRpcClient {
    /// Create a client for `url`.
    pub fn new(url: Url, timeout_secs: u64) -> NearResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NearError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url,
            timeout_secs,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &NearConfig) -> NearResult<Self> {
        let url = config
            .rpc_url
            .parse()
            .map_err(|e| NearError::Encoding(format!("invalid RPC URL '{}': {}", config.rpc_url, e)))?;
        Self::new(url, config.rpc_timeout_secs)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read-only contract call with base64 JSON arguments.
    pub async fn call_function(
        &self,
        contract_id: &str,
        method: &str,
        args: &Value,
    ) -> NearResult<CallFunctionResult> {
        let args = serde_json::to_vec(args)
            .map_err(|e| NearError::Decoding(format!("unserializable view args: {}", e)))?;
        let params = json!({
            "request_type": "call_function",
            "finality": "optimistic",
            "account_id": contract_id,
            "method_name": method,
            "args_base64": BASE64.encode(args),
        });
        self.call("query", params).await
    }

    /// Status of a submitted transaction. `sender` only routes the lookup to a shard.
    pub async fn tx_status(&self, tx_hash: &str, sender: &str) -> NearResult<FinalExecutionOutcome> {
        self.call("tx", json!([tx_hash, sender])).await
    }

    async fn call<P, R>(&self, method: &str, params: P) -> NearResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4().to_string(),
            method,
            params,
        };
        tracing::trace!(method, request_id = %request.id, "NEAR RPC request");

        let response = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        let status = response.status();
        let body: JsonRpcResponse<R> = response.json().await.map_err(|e| {
            if status.is_success() {
                NearError::Decoding(format!("{}: malformed response: {}", method, e))
            } else {
                NearError::Network(format!("{}: HTTP {}", method, status))
            }
        })?;

        match (body.result, body.error) {
            (_, Some(error)) => {
                let error = NearError::from(error);
                tracing::warn!(method, error = %error, "NEAR RPC error");
                Err(error)
            }
            (Some(result), None) => Ok(result),
            (None, None) => Err(NearError::Decoding(format!(
                "{}: response has neither result nor error",
                method
            ))),
        }
    }

    fn transport_error(&self, method: &str, error: reqwest::Error) -> NearError {
        if error.is_timeout() {
            tracing::warn!(method, "NEAR RPC timeout");
            NearError::Timeout(self.timeout_secs)
        } else {
            tracing::warn!(method, error = %error, "NEAR RPC transport error");
            NearError::Network(format!("{}: {}", method, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_object_prefers_cause_and_data() {
        let error: JsonRpcErrorObject = serde_json::from_value(json!({
            "name": "HANDLER_ERROR",
            "cause": {"name": "UNKNOWN_TRANSACTION", "info": {"requested_transaction_hash": "abc"}},
            "code": -32000,
            "message": "Server error",
            "data": "Transaction abc doesn't exist"
        }))
        .unwrap();

        match NearError::from(error) {
            NearError::Rpc { name, message } => {
                assert_eq!(name, "UNKNOWN_TRANSACTION");
                assert_eq!(message, "Transaction abc doesn't exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_object_without_cause() {
        let error: JsonRpcErrorObject =
            serde_json::from_value(json!({"code": -32601, "message": "Method not found"})).unwrap();
        match NearError::from(error) {
            NearError::Rpc { name, message } => {
                assert_eq!(name, "-32601");
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url_is_encoding_error() {
        let config = NearConfig {
            rpc_url: "not a url".to_string(),
            ..NearConfig::default()
        };
        assert!(matches!(
            NearRpcClient::from_config(&config),
            Err(NearError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let client = NearRpcClient::new("http://127.0.0.1:9".parse().unwrap(), 2).unwrap();
        let result = client.call_function("v1.signer", "public_key", &json!({})).await;
        assert!(matches!(
            result,
            Err(NearError::Network(_)) | Err(NearError::Timeout(_))
        ));
    }
}
