//! Source-chain (NEAR) subsystem.
//!
//! # Data Flow
//! ```text
//! WalletConnection (account stream, sign-in, signing)
//!     → session.rs (identity state machine, view/call primitives)
//!     → rpc.rs (call_function views, tx status polling)
//! ```
//!
//! # Constraints
//! - The broker is the only writer of the session identity
//! - State-changing calls require a signed-in account and go through the wallet
//! - Views and status polling talk to the node directly

pub mod rpc;
pub mod session;
pub mod types;
pub mod wallet;

pub use rpc::NearRpcClient;
pub use session::{SessionBroker, Subscription};
pub use types::{
    Action, CallRequest, ExecutionOutcome, ExecutionOutcomeWithId, FinalExecutionOutcome,
    FinalExecutionStatus, FunctionCallAction, NearError, NearResult, SessionIdentity, Transaction,
    TransactionView, ViewRequest, WalletAccount,
};
pub use wallet::{Disconnected, WalletConnection};
