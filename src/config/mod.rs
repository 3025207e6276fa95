//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayerConfig (validated, immutable)
//!     → handed to EvmClient / NearRpcClient / TransactionPipeline at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; endpoint changes go through
//!   `TransactionPipeline::update_provider`
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{EvmConfig, MpcConfig, NearConfig, ObservabilityConfig, RelayerConfig};
