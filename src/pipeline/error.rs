//! Pipeline error type and its coarse classification.

use thiserror::Error;

use crate::evm::EvmError;
use crate::mpc::MpcError;
use crate::near::NearError;

/// Coarse error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Rpc,
    NotSignedIn,
    TransactionRejected,
    Execution,
    SignatureMismatch,
    Encoding,
    Decoding,
    View,
    Config,
}

/// Errors surfaced by the transaction pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Evm(#[from] EvmError),

    #[error(transparent)]
    Near(#[from] NearError),

    #[error(transparent)]
    Mpc(#[from] MpcError),

    /// The signature does not belong to this transaction or sender.
    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Evm(e) => match e {
                EvmError::Network(_) | EvmError::Timeout(_) => ErrorKind::Network,
                EvmError::Rpc { .. } | EvmError::RelayRejected { .. } => ErrorKind::Rpc,
                EvmError::Encoding(_) => ErrorKind::Encoding,
                EvmError::ChainMismatch { .. } => ErrorKind::Config,
            },
            Self::Near(e) => match e {
                NearError::Network(_) | NearError::Timeout(_) => ErrorKind::Network,
                NearError::Rpc { .. } => ErrorKind::Rpc,
                NearError::NotSignedIn | NearError::WalletUnavailable(_) => ErrorKind::NotSignedIn,
                NearError::TransactionRejected(_) => ErrorKind::TransactionRejected,
                NearError::Execution(_) => ErrorKind::Execution,
                NearError::View(_) => ErrorKind::View,
                NearError::Decoding(_) => ErrorKind::Decoding,
                NearError::Encoding(_) => ErrorKind::Encoding,
            },
            Self::Mpc(_) => ErrorKind::Decoding,
            Self::SignatureMismatch(_) => ErrorKind::SignatureMismatch,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
