//! Session broker: signed-in identity and contract-call primitives.
//!
//! # States
//! - SignedOut: `signed_account_id` is empty
//! - SignedIn: `signed_account_id` holds the wallet's active account
//!
//! # State Transitions
//! ```text
//! SignedOut → SignedIn:  account set reports an active account
//! SignedIn  → SignedOut: account set has no active account, or log_out()
//! log_in() never transitions by itself; the wallet's account stream does
//! ```
//!
//! The broker is the only writer of the identity. Subscribers see the latest
//! state only, and never the same state twice in a row.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::NearConfig;
use crate::near::rpc::NearRpcClient;
use crate::near::types::{
    Action, CallRequest, FinalExecutionOutcome, FunctionCallAction, NearError, NearResult,
    SessionIdentity, Transaction, ViewRequest, WalletAccount,
};
use crate::near::wallet::WalletConnection;
use crate::observability::metrics;
use crate::resilience::PollSchedule;

/// Shard routing hint for status lookups when nobody is signed in.
const UNKNOWN_SENDER: &str = "unknown";

/// Handle for an identity callback. Dropping it also unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop aborts the task.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Owns "who is signed in" and exposes view/call primitives.
pub struct SessionBroker {
    rpc: NearRpcClient,
    wallet: Arc<dyn WalletConnection>,
    create_access_key_for: String,
    identity: Arc<watch::Sender<SessionIdentity>>,
    poll_base_delay_ms: u64,
    poll_max_delay_ms: u64,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl SessionBroker {
    /// Create a broker seeded from the wallet's current account set.
    ///
    /// Call [`SessionBroker::follow_wallet`] to track later changes.
    pub fn new(rpc: NearRpcClient, wallet: Arc<dyn WalletConnection>, config: &NearConfig) -> Self {
        let initial = active_identity(&wallet.accounts().borrow());
        metrics::record_signed_in(initial.is_signed_in());
        tracing::info!(
            signed_account_id = %initial.signed_account_id,
            network_id = %config.network_id,
            "Session broker initialized"
        );

        let (identity, _) = watch::channel(initial);
        Self {
            rpc,
            wallet,
            create_access_key_for: config.create_access_key_for.clone(),
            identity: Arc::new(identity),
            poll_base_delay_ms: config.poll_base_delay_ms,
            poll_max_delay_ms: config.poll_max_delay_ms,
            follower: Mutex::new(None),
        }
    }

    /// Track the wallet's account stream on a background task.
    ///
    /// Calling this again replaces the previous follower.
    pub fn follow_wallet(&self) {
        let mut accounts = self.wallet.accounts();
        let identity = self.identity.clone();

        let task = tokio::spawn(async move {
            loop {
                let current = accounts.borrow_and_update().clone();
                apply_accounts(&identity, &current);
                if accounts.changed().await.is_err() {
                    tracing::debug!("Wallet account stream closed");
                    break;
                }
            }
        });

        let previous = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Apply an account-change notification from the wallet.
    pub fn handle_accounts_changed(&self, accounts: &[WalletAccount]) {
        apply_accounts(&self.identity, accounts);
    }

    /// Current identity.
    pub fn identity(&self) -> SessionIdentity {
        self.identity.borrow().clone()
    }

    /// Signed-in account id, empty when signed out.
    pub fn signed_account_id(&self) -> String {
        self.identity.borrow().signed_account_id.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.borrow().is_signed_in()
    }

    /// Receiver that observes identity changes (latest state only).
    pub fn identity_changes(&self) -> watch::Receiver<SessionIdentity> {
        self.identity.subscribe()
    }

    /// Call `callback` on every identity change after this point.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionIdentity) + Send + 'static,
    {
        let mut changes = self.identity.subscribe();
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let identity = changes.borrow_and_update().clone();
                callback(&identity);
            }
        });
        Subscription { task }
    }

    /// Start the wallet's interactive sign-in flow. Does not change the identity.
    pub async fn log_in(&self) -> NearResult<()> {
        tracing::info!(contract_id = %self.create_access_key_for, "Starting wallet sign-in");
        self.wallet.sign_in(&self.create_access_key_for).await
    }

    /// Sign out of the wallet and clear the identity.
    pub async fn log_out(&self) -> NearResult<()> {
        self.wallet.sign_out().await?;
        set_identity(&self.identity, SessionIdentity::default());
        Ok(())
    }

    /// Read-only contract call returning the decoded JSON result.
    pub async fn view_method(&self, request: ViewRequest) -> NearResult<Value> {
        let result = self
            .rpc
            .call_function(&request.contract_id, &request.method, &request.args)
            .await
            .map_err(|e| match e {
                NearError::Rpc { name, message } => {
                    NearError::View(format!("{}.{}: {}: {}", request.contract_id, request.method, name, message))
                }
                other => other,
            })?;

        if let Some(error) = result.error {
            return Err(NearError::View(format!(
                "{}.{}: {}",
                request.contract_id, request.method, error
            )));
        }

        serde_json::from_slice(&result.result).map_err(|e| {
            NearError::View(format!(
                "{}.{} returned non-JSON data: {}",
                request.contract_id, request.method, e
            ))
        })
    }

    /// State-changing contract call through the wallet.
    ///
    /// Fails with `NotSignedIn` before touching the wallet or the network.
    /// Returns the raw outcome; decoding the return value is up to the caller.
    pub async fn call_method(&self, request: CallRequest) -> NearResult<FinalExecutionOutcome> {
        let signed_account_id = self.signed_account_id();
        if signed_account_id.is_empty() {
            return Err(NearError::NotSignedIn);
        }
        let signer_id = if request.account_id.is_empty() {
            signed_account_id
        } else {
            request.account_id
        };

        tracing::info!(
            signer_id = %signer_id,
            contract_id = %request.contract_id,
            method = %request.method,
            gas = request.gas,
            deposit = %request.deposit,
            "Submitting function call"
        );

        let transaction = Transaction {
            signer_id,
            receiver_id: request.contract_id,
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: request.method,
                args: request.args,
                gas: request.gas,
                deposit: request.deposit,
            })],
        };

        let outcome = self.wallet.sign_and_send_transaction(transaction).await?;
        tracing::debug!(
            tx_hash = %outcome.transaction.hash,
            is_final = outcome.status.is_final(),
            logs = ?outcome.logs().collect::<Vec<_>>(),
            "Function call outcome"
        );

        if let Some(Err(NearError::Execution(error))) = outcome.status.last_result() {
            return Err(NearError::Execution(error));
        }
        Ok(outcome)
    }

    /// Poll a transaction until it is final and decode its return value.
    pub async fn get_transaction_result(&self, tx_hash: &str) -> NearResult<Value> {
        let sender = self.signed_account_id();
        let sender = if sender.is_empty() {
            UNKNOWN_SENDER.to_string()
        } else {
            sender
        };
        self.get_transaction_result_for(tx_hash, &sender).await
    }

    /// Like [`SessionBroker::get_transaction_result`] with an explicit sender.
    pub async fn get_transaction_result_for(&self, tx_hash: &str, sender: &str) -> NearResult<Value> {
        let mut schedule = PollSchedule::new(self.poll_base_delay_ms, self.poll_max_delay_ms);
        loop {
            let outcome = self.rpc.tx_status(tx_hash, sender).await?;
            if let Some(result) = outcome.status.last_result() {
                return result;
            }
            tracing::debug!(tx_hash, attempt = schedule.attempts(), "Transaction pending");
            schedule.wait().await;
        }
    }
}

impl Drop for SessionBroker {
    fn drop(&mut self) {
        let follower = self
            .follower
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(follower) = follower {
            follower.abort();
        }
    }
}

impl std::fmt::Debug for SessionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBroker")
            .field("rpc_url", &self.rpc.url().as_str())
            .field("signed_account_id", &self.signed_account_id())
            .finish()
    }
}

fn active_identity(accounts: &[WalletAccount]) -> SessionIdentity {
    accounts
        .iter()
        .find(|account| account.active)
        .map(|account| SessionIdentity::signed_in(account.account_id.clone()))
        .unwrap_or_default()
}

fn apply_accounts(identity: &watch::Sender<SessionIdentity>, accounts: &[WalletAccount]) {
    set_identity(identity, active_identity(accounts));
}

fn set_identity(identity: &watch::Sender<SessionIdentity>, next: SessionIdentity) {
    let changed = identity.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        tracing::info!(
            from = %current.signed_account_id,
            to = %next.signed_account_id,
            "Session identity changed"
        );
        *current = next;
        true
    });
    if changed {
        metrics::record_signed_in(identity.borrow().is_signed_in());
    }
}
