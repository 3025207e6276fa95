//! Shared utilities for integration tests.
//!
//! - `start_json_rpc`: programmable JSON-RPC node on an ephemeral port
//! - `MockEvm`: destination-chain node backed by `start_json_rpc`
//! - `ScriptedWallet`: in-memory `WalletConnection`

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{hex, keccak256, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use url::Url;

use chainsig_relay::near::{
    Action, ExecutionOutcome, ExecutionOutcomeWithId, FinalExecutionOutcome, FinalExecutionStatus,
    NearError, NearResult, Transaction, TransactionView, WalletAccount, WalletConnection,
};

/// Anvil's well-known test account #0. Never use for real funds.
pub const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const RECEIVER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const CHAIN_ID: u64 = 31337;

pub type RpcReply = Result<Value, (i64, String)>;
type RpcHandler = Arc<dyn Fn(&str, &Value) -> RpcReply + Send + Sync>;

/// Start a JSON-RPC 2.0 server whose replies come from `handler(method, params)`.
pub async fn start_json_rpc<F>(handler: F) -> Url
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    start_json_rpc_with_latency(handler, Duration::ZERO).await
}

/// Like [`start_json_rpc`], but every reply is held back by `latency`.
pub async fn start_json_rpc_with_latency<F>(handler: F, latency: Duration) -> Url
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    let handler: RpcHandler = Arc::new(handler);
    let app = Router::new()
        .route("/", post(dispatch))
        .with_state((handler, latency));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr).parse().unwrap()
}

async fn dispatch(
    State((handler, latency)): State<(RpcHandler, Duration)>,
    Json(request): Json<Value>,
) -> Json<Value> {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    Json(match handler(&method, &params) {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }),
    })
}

fn quantity(value: u128) -> Value {
    Value::String(format!("{:#x}", value))
}

/// Scriptable destination-chain node state.
#[derive(Debug, Clone)]
pub struct MockEvm {
    pub chain_id: u64,
    pub nonce: u64,
    pub balance_wei: u128,
    pub gas_price_wei: u128,
    pub priority_fee_wei: u128,
    /// Error message for `eth_sendRawTransaction`, or `None` to accept.
    pub send_error: Option<String>,
    /// Whether `eth_getTransactionReceipt` finds the transaction.
    pub mined: bool,
    /// Delay before every reply.
    pub latency: Duration,
}

impl Default for MockEvm {
    fn default() -> Self {
        Self {
            chain_id: CHAIN_ID,
            nonce: 0,
            balance_wei: 10_000_000_000_000_000_000,
            gas_price_wei: 30_000_000_000,
            priority_fee_wei: 2_000_000_000,
            send_error: None,
            mined: false,
            latency: Duration::ZERO,
        }
    }
}

impl MockEvm {
    /// Serve this state. Returns the URL and a log of every method called.
    pub async fn start(self) -> (Url, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();
        let latency = self.latency;
        let url = start_json_rpc_with_latency(
            move |method, params| {
                log.lock().unwrap().push(method.to_string());
                self.reply(method, params)
            },
            latency,
        )
        .await;
        (url, calls)
    }

    fn reply(&self, method: &str, params: &Value) -> RpcReply {
        match method {
            "eth_chainId" => Ok(quantity(self.chain_id as u128)),
            "eth_getTransactionCount" => Ok(quantity(self.nonce as u128)),
            "eth_getBalance" => Ok(quantity(self.balance_wei)),
            "eth_gasPrice" => Ok(quantity(self.gas_price_wei)),
            "eth_maxPriorityFeePerGas" => Ok(quantity(self.priority_fee_wei)),
            "eth_sendRawTransaction" => match &self.send_error {
                Some(message) => Err((-32000, message.clone())),
                None => {
                    let raw = params[0].as_str().unwrap_or_default();
                    let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap_or_default();
                    Ok(Value::String(keccak256(bytes).to_string()))
                }
            },
            "eth_getTransactionReceipt" if self.mined => {
                Ok(mined_receipt(params[0].as_str().unwrap_or_default()))
            }
            "eth_getTransactionReceipt" => Ok(Value::Null),
            other => Err((-32601, format!("the method {} does not exist", other))),
        }
    }
}

fn mined_receipt(tx_hash: &str) -> Value {
    json!({
        "type": "0x2",
        "status": "0x1",
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0x11).to_string(),
        "blockNumber": "0x1",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x6fc23ac00",
        "from": Address::repeat_byte(0x22).to_string(),
        "to": RECEIVER,
        "contractAddress": null
    })
}

/// `query`/`call_function` result carrying `value` as JSON bytes.
pub fn view_result(value: &Value) -> Value {
    json!({
        "result": value.to_string().into_bytes(),
        "logs": [],
        "block_height": 1,
        "block_hash": "11111111111111111111111111111111"
    })
}

/// Base64 JSON, as carried in `SuccessValue`.
pub fn success_value(value: &Value) -> FinalExecutionStatus {
    FinalExecutionStatus::SuccessValue(BASE64.encode(value.to_string()))
}

pub fn outcome(hash: &str, signer_id: &str, status: FinalExecutionStatus) -> FinalExecutionOutcome {
    FinalExecutionOutcome {
        status,
        transaction: TransactionView {
            hash: hash.to_string(),
            signer_id: signer_id.to_string(),
            receiver_id: "v1.signer-prod.testnet".to_string(),
        },
        transaction_outcome: ExecutionOutcomeWithId {
            id: hash.to_string(),
            outcome: ExecutionOutcome::default(),
        },
        receipts_outcome: Vec::new(),
    }
}

/// `sign` return value in the `{r, s, v}` shape, signed with `signer`.
pub fn mpc_sign_result(signer: &PrivateKeySigner, digest: B256) -> Value {
    let signature = signer.sign_hash_sync(&digest).unwrap();
    json!({
        "r": B256::from(signature.r().to_be_bytes::<32>()).to_string(),
        "s": B256::from(signature.s().to_be_bytes::<32>()).to_string(),
        "v": u8::from(signature.v()),
    })
}

/// Payload bytes of the `sign` call in `transaction`.
pub fn sign_payload(transaction: &Transaction) -> B256 {
    let Action::FunctionCall(call) = &transaction.actions[0];
    let bytes: Vec<u8> = call.args["request"]["payload"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b.as_u64().unwrap() as u8)
        .collect();
    B256::from_slice(&bytes)
}

type Responder = Box<dyn Fn(&Transaction) -> NearResult<FinalExecutionOutcome> + Send + Sync>;

/// In-memory wallet with a scripted account set and transaction responses.
pub struct ScriptedWallet {
    accounts: watch::Sender<Vec<WalletAccount>>,
    responder: Mutex<Option<Responder>>,
    pub submitted: Mutex<VecDeque<Transaction>>,
    pub sign_in_calls: AtomicUsize,
}

impl ScriptedWallet {
    pub fn new() -> Arc<Self> {
        let (accounts, _) = watch::channel(Vec::new());
        Arc::new(Self {
            accounts,
            responder: Mutex::new(None),
            submitted: Mutex::new(VecDeque::new()),
            sign_in_calls: AtomicUsize::new(0),
        })
    }

    /// Publish a new account set, as a wallet does after sign-in or account switch.
    pub fn emit_accounts(&self, accounts: Vec<WalletAccount>) {
        self.accounts.send_replace(accounts);
    }

    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&Transaction) -> NearResult<FinalExecutionOutcome> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Some(Box::new(responder));
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletConnection for ScriptedWallet {
    fn accounts(&self) -> watch::Receiver<Vec<WalletAccount>> {
        self.accounts.subscribe()
    }

    async fn sign_in(&self, _contract_id: &str) -> NearResult<()> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_out(&self) -> NearResult<()> {
        self.accounts.send_replace(Vec::new());
        Ok(())
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> NearResult<FinalExecutionOutcome> {
        self.submitted.lock().unwrap().push_back(transaction.clone());
        match self.responder.lock().unwrap().as_ref() {
            Some(respond) => respond(&transaction),
            None => Err(NearError::TransactionRejected("no scripted response".to_string())),
        }
    }
}
