//! Session broker behavior against a scripted wallet and a mock NEAR node.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use chainsig_relay::config::NearConfig;
use chainsig_relay::near::{
    CallRequest, FinalExecutionStatus, NearError, NearRpcClient, SessionBroker, SessionIdentity,
    ViewRequest, WalletAccount,
};

mod common;
use common::ScriptedWallet;

fn broker(wallet: Arc<ScriptedWallet>, near_url: &str) -> SessionBroker {
    let config = NearConfig {
        rpc_url: near_url.to_string(),
        poll_base_delay_ms: 10,
        poll_max_delay_ms: 40,
        ..NearConfig::default()
    };
    SessionBroker::new(NearRpcClient::from_config(&config).unwrap(), wallet, &config)
}

/// Wait until the identity satisfies `predicate`.
async fn wait_for(broker: &SessionBroker, predicate: impl Fn(&SessionIdentity) -> bool) {
    let mut changes = broker.identity_changes();
    tokio::time::timeout(Duration::from_secs(2), changes.wait_for(|identity| predicate(identity)))
        .await
        .expect("identity did not change in time")
        .unwrap();
}

#[tokio::test]
async fn test_account_stream_drives_identity() {
    let wallet = ScriptedWallet::new();
    let broker = broker(wallet.clone(), "http://127.0.0.1:9");
    broker.follow_wallet();

    wallet.emit_accounts(vec![WalletAccount::new("alice.near", true)]);
    wait_for(&broker, |identity| identity.signed_account_id == "alice.near").await;
    assert!(broker.is_signed_in());

    wallet.emit_accounts(vec![]);
    wait_for(&broker, |identity| identity.signed_account_id.is_empty()).await;
    assert_eq!(broker.signed_account_id(), "");
}

#[tokio::test]
async fn test_identity_seeded_from_wallet() {
    let wallet = ScriptedWallet::new();
    wallet.emit_accounts(vec![
        WalletAccount::new("bob.near", false),
        WalletAccount::new("carol.near", true),
    ]);
    let broker = broker(wallet, "http://127.0.0.1:9");
    assert_eq!(broker.signed_account_id(), "carol.near");
}

#[tokio::test]
async fn test_signed_out_call_makes_no_wallet_or_network_call() {
    let requests = Arc::new(AtomicUsize::new(0));
    let seen = requests.clone();
    let near_url = common::start_json_rpc(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(json!(null))
    })
    .await;

    let wallet = ScriptedWallet::new();
    let broker = broker(wallet.clone(), near_url.as_str());

    let result = broker
        .call_method(CallRequest::new("", "v1.signer-prod.testnet", "sign", json!({})))
        .await;
    assert!(matches!(result, Err(NearError::NotSignedIn)));
    assert_eq!(wallet.submitted_count(), 0);
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_call_method_uses_signed_account_and_defaults() {
    let wallet = ScriptedWallet::new();
    wallet.emit_accounts(vec![WalletAccount::new("alice.near", true)]);
    wallet.respond_with(|tx| {
        Ok(common::outcome("call-tx", &tx.signer_id, common::success_value(&json!({"ok": true}))))
    });
    let broker = broker(wallet.clone(), "http://127.0.0.1:9");

    let outcome = broker
        .call_method(CallRequest::new("", "counter.near", "increment", json!({"by": 2})))
        .await
        .unwrap();
    assert_eq!(outcome.transaction.signer_id, "alice.near");

    let submitted = wallet.submitted.lock().unwrap();
    let tx = &submitted[0];
    assert_eq!(tx.receiver_id, "counter.near");
    let wire = serde_json::to_value(tx).unwrap();
    assert_eq!(wire["actions"][0]["type"], "FunctionCall");
    assert_eq!(wire["actions"][0]["params"]["methodName"], "increment");
    assert_eq!(wire["actions"][0]["params"]["gas"], "30000000000000");
    assert_eq!(wire["actions"][0]["params"]["deposit"], "0");
}

#[tokio::test]
async fn test_call_method_failures() {
    let wallet = ScriptedWallet::new();
    wallet.emit_accounts(vec![WalletAccount::new("alice.near", true)]);
    let broker = broker(wallet.clone(), "http://127.0.0.1:9");

    // No scripted response: the wallet declines.
    let result = broker
        .call_method(CallRequest::new("", "counter.near", "increment", json!({})))
        .await;
    assert!(matches!(result, Err(NearError::TransactionRejected(_))));

    wallet.respond_with(|tx| {
        let failure = FinalExecutionStatus::Failure(json!({"ActionError": {"index": 0}}));
        Ok(common::outcome("failed-tx", &tx.signer_id, failure))
    });
    let result = broker
        .call_method(CallRequest::new("", "counter.near", "increment", json!({})))
        .await;
    assert!(matches!(result, Err(NearError::Execution(_))));
}

#[tokio::test]
async fn test_view_method_decodes_json() {
    let near_url = common::start_json_rpc(|method, params| {
        assert_eq!(method, "query");
        assert_eq!(params["request_type"], "call_function");
        assert_eq!(params["account_id"], "counter.near");
        // {"owner":"alice.near"}
        assert_eq!(params["args_base64"], "eyJvd25lciI6ImFsaWNlLm5lYXIifQ==");
        Ok(common::view_result(&json!({"count": 5})))
    })
    .await;
    let broker = broker(ScriptedWallet::new(), near_url.as_str());

    let value = broker
        .view_method(ViewRequest::new("counter.near", "get", json!({"owner": "alice.near"})))
        .await
        .unwrap();
    assert_eq!(value, json!({"count": 5}));
}

#[tokio::test]
async fn test_view_method_contract_error() {
    let near_url = common::start_json_rpc(|_, _| {
        Ok(json!({
            "result": [],
            "logs": [],
            "error": "wasm execution failed with error: MethodNotFound",
            "block_height": 1
        }))
    })
    .await;
    let broker = broker(ScriptedWallet::new(), near_url.as_str());

    let result = broker
        .view_method(ViewRequest::new("counter.near", "missing", json!({})))
        .await;
    assert!(matches!(result, Err(NearError::View(_))));
}

#[tokio::test]
async fn test_transaction_result_polls_until_final() {
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = polls.clone();
    let near_url = common::start_json_rpc(move |method, params| {
        assert_eq!(method, "tx");
        assert_eq!(params[1], "unknown");
        let status = if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            FinalExecutionStatus::Started
        } else {
            common::success_value(&json!("done"))
        };
        Ok(serde_json::to_value(common::outcome("poll-tx", "alice.near", status)).unwrap())
    })
    .await;
    let broker = broker(ScriptedWallet::new(), near_url.as_str());

    let value = broker.get_transaction_result("poll-tx").await.unwrap();
    assert_eq!(value, json!("done"));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe() {
    let wallet = ScriptedWallet::new();
    let broker = broker(wallet.clone(), "http://127.0.0.1:9");
    broker.follow_wallet();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = broker.subscribe(move |identity| {
        sink.lock().unwrap().push(identity.signed_account_id.clone());
    });

    wallet.emit_accounts(vec![WalletAccount::new("alice.near", true)]);
    wait_for(&broker, |identity| identity.is_signed_in()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().last().map(String::as_str), Some("alice.near"));

    subscription.unsubscribe();
    let delivered = seen.lock().unwrap().len();

    wallet.emit_accounts(vec![]);
    wait_for(&broker, |identity| !identity.is_signed_in()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().len(), delivered);
}

#[tokio::test]
async fn test_log_in_and_log_out() {
    let wallet = ScriptedWallet::new();
    wallet.emit_accounts(vec![WalletAccount::new("alice.near", true)]);
    let broker = broker(wallet.clone(), "http://127.0.0.1:9");

    broker.log_in().await.unwrap();
    assert_eq!(wallet.sign_in_calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.signed_account_id(), "alice.near");

    broker.log_out().await.unwrap();
    assert!(!broker.is_signed_in());
}
