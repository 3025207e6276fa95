//! Consumer-facing view of the pipeline.
//!
//! # Responsibilities
//! - One loading flag per stage, raised for the duration of each call
//! - A single last-error slot shared by all stages
//! - Stage latency and outcome metrics
//!
//! Stage methods never return errors. They return `None` and leave the error
//! in the slot, which the next call of any stage clears.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use alloy::consensus::TxEip1559;
use alloy::primitives::{Address, B256, U256};

use crate::evm::{ChainEndpoint, GasEstimate, RelayReceipt, SignedTransaction, UnsignedTransactionPayload};
use crate::near::SessionBroker;
use crate::observability::metrics;
use crate::pipeline::engine::TransactionPipeline;
use crate::pipeline::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Provider,
    GasPrice,
    Balance,
    Payload,
    Signature,
    Relay,
    DeriveAddress,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Provider => "update_provider",
            Stage::GasPrice => "query_gas_price",
            Stage::Balance => "get_balance",
            Stage::Payload => "create_payload",
            Stage::Signature => "request_signature",
            Stage::Relay => "relay_transaction",
            Stage::DeriveAddress => "derive_address",
        }
    }
}

/// Counts calls in flight so overlapping calls of one stage keep the flag up.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wraps a [`TransactionPipeline`] and its session with loading and error state.
pub struct PipelineReporter {
    pipeline: Arc<TransactionPipeline>,
    session: Arc<SessionBroker>,
    provider_loading: AtomicUsize,
    gas_price_loading: AtomicUsize,
    address_loading: AtomicUsize,
    balance_loading: AtomicUsize,
    payload_loading: AtomicUsize,
    signature_loading: AtomicUsize,
    tx_loading: AtomicUsize,
    last_error: Mutex<Option<PipelineError>>,
}

impl PipelineReporter {
    pub fn new(pipeline: Arc<TransactionPipeline>, session: Arc<SessionBroker>) -> Self {
        Self {
            pipeline,
            session,
            provider_loading: AtomicUsize::new(0),
            gas_price_loading: AtomicUsize::new(0),
            address_loading: AtomicUsize::new(0),
            balance_loading: AtomicUsize::new(0),
            payload_loading: AtomicUsize::new(0),
            signature_loading: AtomicUsize::new(0),
            tx_loading: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &Arc<TransactionPipeline> {
        &self.pipeline
    }

    pub fn session(&self) -> &Arc<SessionBroker> {
        &self.session
    }

    pub fn is_provider_loading(&self) -> bool {
        self.provider_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_gas_price_loading(&self) -> bool {
        self.gas_price_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_address_loading(&self) -> bool {
        self.address_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_balance_loading(&self) -> bool {
        self.balance_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_payload_loading(&self) -> bool {
        self.payload_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_signature_loading(&self) -> bool {
        self.signature_loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_tx_loading(&self) -> bool {
        self.tx_loading.load(Ordering::SeqCst) > 0
    }

    /// Error of the most recent failed call, until the next call starts.
    pub fn last_error(&self) -> Option<PipelineError> {
        self.error_slot().clone()
    }

    pub fn is_error(&self) -> bool {
        self.error_slot().is_some()
    }

    pub async fn update_provider(&self, endpoint: ChainEndpoint) -> Option<()> {
        self.run(Stage::Provider, self.pipeline.update_provider(endpoint))
            .await
    }

    pub async fn query_gas_price(&self) -> Option<GasEstimate> {
        self.run(Stage::GasPrice, self.pipeline.query_gas_price()).await
    }

    pub async fn get_balance(&self, address: &str) -> Option<U256> {
        self.run(Stage::Balance, self.pipeline.get_balance(address))
            .await
    }

    pub async fn create_payload(
        &self,
        sender: &str,
        receiver: &str,
        amount: U256,
        data: &str,
    ) -> Option<UnsignedTransactionPayload> {
        self.run(
            Stage::Payload,
            self.pipeline.create_payload(sender, receiver, amount, data),
        )
        .await
    }

    pub async fn request_signature_to_mpc(
        &self,
        mpc_contract_id: &str,
        path: &str,
        digest: B256,
        transaction: TxEip1559,
        sender: Address,
    ) -> Option<SignedTransaction> {
        self.run(
            Stage::Signature,
            self.pipeline.request_signature_to_mpc(
                &self.session,
                mpc_contract_id,
                path,
                digest,
                transaction,
                sender,
            ),
        )
        .await
    }

    pub async fn relay_transaction(&self, signed: &SignedTransaction) -> Option<RelayReceipt> {
        self.run(Stage::Relay, self.pipeline.relay_transaction(signed))
            .await
    }

    pub async fn derive_address(
        &self,
        mpc_contract_id: &str,
        predecessor: &str,
        path: &str,
    ) -> Option<Address> {
        self.run(
            Stage::DeriveAddress,
            self.pipeline
                .derive_address(&self.session, mpc_contract_id, predecessor, path),
        )
        .await
    }

    fn flag(&self, stage: Stage) -> &AtomicUsize {
        match stage {
            Stage::Provider => &self.provider_loading,
            Stage::GasPrice => &self.gas_price_loading,
            Stage::DeriveAddress => &self.address_loading,
            Stage::Balance => &self.balance_loading,
            Stage::Payload => &self.payload_loading,
            Stage::Signature => &self.signature_loading,
            Stage::Relay => &self.tx_loading,
        }
    }

    fn error_slot(&self) -> std::sync::MutexGuard<'_, Option<PipelineError>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run<T, F>(&self, stage: Stage, operation: F) -> Option<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        *self.error_slot() = None;
        let _loading = LoadingGuard::enter(self.flag(stage));
        let started = Instant::now();

        let result = operation.await;
        metrics::record_stage(stage.name(), result.is_ok(), started);

        match result {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(
                    stage = stage.name(),
                    kind = ?error.kind(),
                    error = %error,
                    "Pipeline stage failed"
                );
                *self.error_slot() = Some(error);
                None
            }
        }
    }
}

impl std::fmt::Debug for PipelineReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineReporter")
            .field("pipeline", &self.pipeline)
            .field("session", &self.session)
            .field("last_error", &self.last_error())
            .finish()
    }
}
