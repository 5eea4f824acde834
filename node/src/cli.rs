// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CLI Interface
//!
//! Command-line structure for `tally-node`, via `clap` derive. Runtime
//! options fall back to `TALLY_*` environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT, NETWORK_DEVNET};

/// Tally settlement node.
///
/// Hosts the receipt contract over a sled ledger and serves it over a
/// REST + JSON-RPC API, with Prometheus metrics on a separate port. Also
/// carries the wallet-side key tooling needed to talk to it.
#[derive(Parser, Debug)]
#[command(
    name = "tally-node",
    about = "Tally receipt settlement node",
    version,
    propagate_version = true
)]
pub struct TallyNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Create the data directory, the ledger database and a user key.
    Init(InitArgs),
    /// Print a BLS public key and `register` calldata for an address.
    Keygen(KeygenArgs),
    /// Print signed `initWithdraw` calldata.
    SignWithdrawal(SignWithdrawalArgs),
    /// Query the status of a running node via its API.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Node data directory. The ledger lives in `<data_dir>/ledger`.
    #[arg(long, short = 'd', env = "TALLY_DATA_DIR", default_value = ".tally")]
    pub data_dir: PathBuf,

    /// Port for the REST and JSON-RPC API.
    #[arg(long, env = "TALLY_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TALLY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Network name: mainnet, testnet or devnet. Operator funding is only
    /// exposed on devnet.
    #[arg(long, env = "TALLY_NETWORK", default_value = NETWORK_DEVNET)]
    pub network: String,

    /// Log format: pretty or json.
    #[arg(long, env = "TALLY_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "TALLY_DATA_DIR", default_value = ".tally")]
    pub data_dir: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Hex-encoded 20-byte address that withdrawals will be paid to.
    #[arg(long)]
    pub address: String,

    /// Use the key in this file instead of generating one.
    #[arg(long, conflicts_with = "seed")]
    pub key_file: Option<PathBuf>,

    /// Derive the key deterministically from this seed. Devnet fixtures only.
    #[arg(long)]
    pub seed: Option<String>,

    /// Save the key to this file (mode 0600).
    #[arg(long, conflicts_with = "key_file")]
    pub out: Option<PathBuf>,
}

/// Arguments for the `sign-withdrawal` subcommand.
#[derive(Parser, Debug)]
pub struct SignWithdrawalArgs {
    /// Key file of the withdrawing user.
    #[arg(long)]
    pub key_file: PathBuf,

    /// Registry index of the withdrawing user.
    #[arg(long)]
    pub index: u64,

    /// Account nonce the withdrawal will take: current nonce plus one.
    #[arg(long)]
    pub nonce: u64,

    /// Amount to withdraw.
    #[arg(long)]
    pub amount: u128,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, env = "TALLY_RPC_URL", default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}
