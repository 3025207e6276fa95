//! chainsig-relay command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   relayer.toml ──► load_config ──► TransactionPipeline ──► destination RPC
//!                                 └► SessionBroker ────────► NEAR RPC
//!                                      (no wallet attached: views and
//!                                       status lookups only)
//! ```
//!
//! Signing needs an interactive wallet, so the binary covers the read paths,
//! payload construction and broadcast of already signed transactions.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{hex, U256};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use chainsig_relay::config::{load_config, RelayerConfig};
use chainsig_relay::evm::transaction::decode_signed;
use chainsig_relay::near::{Disconnected, NearRpcClient, SessionBroker, ViewRequest};
use chainsig_relay::observability::{logging, metrics};
use chainsig_relay::TransactionPipeline;

#[derive(Parser)]
#[command(name = "chainsig-relay")]
#[command(about = "Sign EVM transactions with NEAR chain signatures", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current fee market of the destination chain
    GasPrice,
    /// Balance of an address in wei
    Balance { address: String },
    /// Build an unsigned transfer and print its signing digest
    Payload {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        receiver: String,
        /// Value in wei
        #[arg(long, default_value = "0")]
        amount: String,
        /// Hex calldata
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Broadcast an EIP-2718 encoded signed transaction
    Relay {
        #[arg(long)]
        raw: String,
    },
    /// Read-only contract call on NEAR
    View {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        method: String,
        /// JSON arguments
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Wait for a NEAR transaction and print its return value
    TxResult {
        hash: String,
        #[arg(long)]
        sender: String,
    },
    /// EVM address controlled by a NEAR account through the MPC contract
    DeriveAddress {
        predecessor: String,
        /// Derivation path, defaults to the configured one
        #[arg(long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::debug!(
        evm_rpc = %config.evm.rpc_url,
        chain_id = config.evm.chain_id,
        near_rpc = %config.near.rpc_url,
        mpc_contract = %config.mpc.contract_id,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let pipeline = TransactionPipeline::from_config(&config)?;

    match cli.command {
        Commands::GasPrice => {
            print_json(&pipeline.query_gas_price().await?)?;
        }
        Commands::Balance { address } => {
            let balance = pipeline.get_balance(&address).await?;
            println!("{}", balance);
        }
        Commands::Payload {
            sender,
            receiver,
            amount,
            data,
        } => {
            let amount: U256 = amount
                .parse()
                .map_err(|e| format!("Invalid amount '{}': {}", amount, e))?;
            let payload = pipeline
                .create_payload(&sender, &receiver, amount, &data)
                .await?;
            print_json(&payload)?;
        }
        Commands::Relay { raw } => {
            let bytes = hex::decode(raw.trim().trim_start_matches("0x"))?;
            let signed = decode_signed(&bytes)?;
            print_json(&pipeline.relay_transaction(&signed).await?)?;
        }
        Commands::View {
            contract,
            method,
            args,
        } => {
            let args: Value = serde_json::from_str(&args)?;
            let result = session(&config)?
                .view_method(ViewRequest::new(contract, method, args))
                .await?;
            print_json(&result)?;
        }
        Commands::TxResult { hash, sender } => {
            let result = session(&config)?
                .get_transaction_result_for(&hash, &sender)
                .await?;
            print_json(&result)?;
        }
        Commands::DeriveAddress { predecessor, path } => {
            let path = path.unwrap_or_else(|| config.mpc.derivation_path.clone());
            let address = pipeline
                .derive_address(&session(&config)?, &config.mpc.contract_id, &predecessor, &path)
                .await?;
            println!("{}", address);
        }
    }

    Ok(())
}

fn session(config: &RelayerConfig) -> Result<SessionBroker, Box<dyn std::error::Error>> {
    let rpc = NearRpcClient::from_config(&config.near)?;
    Ok(SessionBroker::new(
        rpc,
        Arc::new(Disconnected::default()),
        &config.near,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
