//! Transaction-signing pipeline.
//!
//! # Architecture
//! ```text
//!             ┌────────────────────┐
//!  consumer ─►│  PipelineReporter  │  loading flags, last error, metrics
//!             └─────────┬──────────┘
//!                       ▼
//!             ┌────────────────────┐        ┌───────────────┐
//!             │ TransactionPipeline│───────►│ SessionBroker │──► wallet / NEAR RPC
//!             └─────────┬──────────┘        └───────────────┘
//!                       ▼
//!                  EvmClient (ArcSwap) ──► destination JSON-RPC
//! ```

pub mod engine;
pub mod error;
pub mod reporter;

pub use engine::{assemble_signed_transaction, TransactionPipeline};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use reporter::PipelineReporter;
