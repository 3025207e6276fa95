//! Destination-chain transaction pipeline.
//!
//! # Data Flow
//! ```text
//! create_payload ──► nonce + gas estimate ──► build_payload ──► (tx, digest)
//!                                                                   │
//! request_signature_to_mpc ◄────────────────────────────────────────┘
//!   ├─ digest == tx.signature_hash()?          (else SignatureMismatch)
//!   ├─ SessionBroker::call_method(mpc, "sign")
//!   ├─ MpcSignature::from_value(outcome)
//!   └─ recover(digest) == sender?              (else SignatureMismatch)
//!                                                                   │
//! relay_transaction ◄───────────────────────────────────────────────┘
//!   └─ eth_sendRawTransaction ──► RelayReceipt
//! ```
//!
//! The active client lives in an `ArcSwap`. Calls in flight keep the client
//! they started with; `update_provider` only affects calls made after it.

use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEip1559};
use alloy::primitives::{Address, B256, U256};
use arc_swap::ArcSwap;
use serde_json::json;

use crate::config::{MpcConfig, RelayerConfig};
use crate::evm::transaction::{
    attach_signature, build_payload, encode_signed, parse_address, parse_calldata,
};
use crate::evm::{
    ChainEndpoint, EvmClient, EvmError, GasEstimate, RelayReceipt, RelayRejection,
    SignedTransaction, UnsignedTransactionPayload,
};
use crate::mpc::{
    derive_eth_address, parse_root_public_key, MpcError, MpcSignature, MpcSignatureRequest,
    PUBLIC_KEY_METHOD, SIGN_METHOD,
};
use crate::near::{CallRequest, SessionBroker, ViewRequest};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// Gas estimate, payload assembly, MPC signing and broadcast for one destination chain.
pub struct TransactionPipeline {
    client: ArcSwap<EvmClient>,
    rpc_timeout_secs: u64,
    gas_limit: u64,
    mpc: MpcConfig,
}

impl TransactionPipeline {
    /// Create a pipeline without touching the network.
    pub fn new(endpoint: ChainEndpoint, rpc_timeout_secs: u64, gas_limit: u64, mpc: MpcConfig) -> Self {
        Self {
            client: ArcSwap::from_pointee(EvmClient::new(endpoint, rpc_timeout_secs)),
            rpc_timeout_secs,
            gas_limit,
            mpc,
        }
    }

    pub fn from_config(config: &RelayerConfig) -> PipelineResult<Self> {
        let endpoint = ChainEndpoint::try_from(&config.evm)?;
        Ok(Self::new(
            endpoint,
            config.evm.rpc_timeout_secs,
            config.evm.gas_limit,
            config.mpc.clone(),
        ))
    }

    /// The endpoint new calls will use.
    pub fn endpoint(&self) -> ChainEndpoint {
        self.client.load().endpoint().clone()
    }

    /// Switch to another endpoint after checking that it serves the expected chain.
    ///
    /// On failure the current client stays active.
    pub async fn update_provider(&self, endpoint: ChainEndpoint) -> PipelineResult<()> {
        let previous = self.endpoint();
        let client = EvmClient::connect(endpoint, self.rpc_timeout_secs).await?;
        tracing::info!(
            from = %previous.rpc_url,
            to = %client.endpoint().rpc_url,
            chain_id = client.chain_id(),
            "Provider updated"
        );
        self.client.store(Arc::new(client));
        Ok(())
    }

    /// Current fee market. Never cached.
    pub async fn query_gas_price(&self) -> PipelineResult<GasEstimate> {
        Ok(self.client.load_full().query_gas_price().await?)
    }

    /// Balance of `address` in wei.
    pub async fn get_balance(&self, address: &str) -> PipelineResult<U256> {
        let address = parse_address("account", address)?;
        Ok(self.client.load_full().get_balance(address).await?)
    }

    /// Build an unsigned EIP-1559 transfer from `sender` and its signing digest.
    ///
    /// Inputs are validated before any network call.
    pub async fn create_payload(
        &self,
        sender: &str,
        receiver: &str,
        amount: U256,
        data: &str,
    ) -> PipelineResult<UnsignedTransactionPayload> {
        let sender = parse_address("sender", sender)?;
        let receiver = parse_address("receiver", receiver)?;
        let input = parse_calldata(data)?;

        let client = self.client.load_full();
        let nonce = client.get_transaction_count(sender).await?;
        let gas = client.query_gas_price().await?;
        let payload = build_payload(
            client.chain_id(),
            nonce,
            self.gas_limit,
            &gas,
            receiver,
            amount,
            input,
        )?;

        tracing::info!(
            %sender,
            %receiver,
            %amount,
            nonce,
            chain_id = client.chain_id(),
            digest = %payload.digest,
            "Payload created"
        );
        Ok(payload)
    }

    /// Have the MPC contract sign `digest` and attach the signature to `transaction`.
    ///
    /// `sender` is the address derived for the signed-in account at `path`.
    pub async fn request_signature_to_mpc(
        &self,
        session: &SessionBroker,
        mpc_contract_id: &str,
        path: &str,
        digest: B256,
        transaction: TxEip1559,
        sender: Address,
    ) -> PipelineResult<SignedTransaction> {
        check_digest(&transaction, digest)?;

        let request = MpcSignatureRequest {
            path: path.to_string(),
            payload: digest,
            key_version: self.mpc.key_version,
            signer_account: session.signed_account_id(),
        };
        tracing::info!(
            signer_account = %request.signer_account,
            mpc_contract_id,
            path,
            %digest,
            "Requesting MPC signature"
        );

        let call = CallRequest::new("", mpc_contract_id, SIGN_METHOD, request.to_args())
            .with_gas(self.mpc.sign_gas)
            .with_deposit(self.mpc.sign_deposit);
        let outcome = session.call_method(call).await?;

        let value = match outcome.status.last_result() {
            Some(result) => result?,
            None => {
                tracing::debug!(tx_hash = %outcome.transaction.hash, "Sign call not final, polling");
                session.get_transaction_result(&outcome.transaction.hash).await?
            }
        };

        let signature = MpcSignature::from_value(&value)?;
        assemble_signed_transaction(transaction, digest, &signature, sender)
    }

    /// Broadcast a signed transaction.
    ///
    /// Resubmitting a transaction the node already has, or one that is already
    /// mined, returns the same hash instead of an error.
    pub async fn relay_transaction(&self, signed: &SignedTransaction) -> PipelineResult<RelayReceipt> {
        let raw = encode_signed(signed);
        let local_hash = *signed.hash();
        let client = self.client.load_full();

        let message = match client.send_raw_transaction(&raw).await {
            Ok(tx_hash) => {
                tracing::info!(%tx_hash, chain_id = client.chain_id(), "Transaction relayed");
                return Ok(RelayReceipt { tx_hash });
            }
            Err(EvmError::Rpc { message, .. }) => message,
            Err(e) => return Err(e.into()),
        };

        let kind = RelayRejection::classify(&message);
        match kind {
            RelayRejection::AlreadyKnown => {
                tracing::info!(tx_hash = %local_hash, "Transaction already known to node");
                return Ok(RelayReceipt { tx_hash: local_hash });
            }
            RelayRejection::NonceTooLow => {
                if let Ok(Some(_)) = client.get_transaction_receipt(local_hash).await {
                    tracing::info!(tx_hash = %local_hash, "Transaction already mined");
                    return Ok(RelayReceipt { tx_hash: local_hash });
                }
            }
            _ => {}
        }

        tracing::warn!(
            tx_hash = %local_hash,
            ?kind,
            resubmittable = kind.is_resubmittable(),
            error = %message,
            "Relay rejected"
        );
        Err(EvmError::RelayRejected { kind, message }.into())
    }

    /// EVM address the MPC network signs for as `predecessor` at `path`.
    pub async fn derive_address(
        &self,
        session: &SessionBroker,
        mpc_contract_id: &str,
        predecessor: &str,
        path: &str,
    ) -> PipelineResult<Address> {
        let value = session
            .view_method(ViewRequest::new(mpc_contract_id, PUBLIC_KEY_METHOD, json!({})))
            .await?;
        let encoded = value.as_str().ok_or_else(|| {
            MpcError::InvalidPublicKey(format!("expected a string public key, got {}", value))
        })?;

        let root = parse_root_public_key(encoded)?;
        let address = derive_eth_address(&root, predecessor, path)?;
        tracing::debug!(predecessor, path, %address, "Derived address");
        Ok(address)
    }
}

impl std::fmt::Debug for TransactionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPipeline")
            .field("endpoint", &self.endpoint())
            .field("gas_limit", &self.gas_limit)
            .field("mpc_contract_id", &self.mpc.contract_id)
            .finish()
    }
}

/// Attach the MPC signature whose parity recovers `sender`.
pub fn assemble_signed_transaction(
    transaction: TxEip1559,
    digest: B256,
    signature: &MpcSignature,
    sender: Address,
) -> PipelineResult<SignedTransaction> {
    check_digest(&transaction, digest)?;

    for candidate in signature.candidates() {
        match candidate.recover_address_from_prehash(&digest) {
            Ok(recovered) if recovered == sender => {
                return Ok(attach_signature(transaction, candidate));
            }
            Ok(recovered) => {
                tracing::debug!(%recovered, %sender, y_parity = candidate.v(), "Parity recovers another signer");
            }
            Err(e) => {
                tracing::debug!(error = %e, y_parity = candidate.v(), "Recovery failed");
            }
        }
    }

    Err(PipelineError::SignatureMismatch(format!(
        "signature over {} does not recover to {}",
        digest, sender
    )))
}

fn check_digest(transaction: &TxEip1559, digest: B256) -> PipelineResult<()> {
    let expected = transaction.signature_hash();
    if expected != digest {
        return Err(PipelineError::SignatureMismatch(format!(
            "digest {} is not the signing hash {} of this transaction",
            digest, expected
        )));
    }
    Ok(())
}
