// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally Node
//!
//! Entry point for the `tally-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger and serves the
//! receipt contract over HTTP.
//!
//! Subcommands:
//!
//! - `run`: serve the API and metrics endpoints
//! - `init`: create the data directory, ledger and a user key
//! - `keygen`: print a public key and `register` calldata
//! - `sign-withdrawal`: print signed `initWithdraw` calldata
//! - `status`: query a running node's status endpoint
//! - `version`: print build version information

mod api;
mod cli;
mod keys;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use tally_protocol::config::{is_known_network, PROTOCOL_VERSION};
use tally_protocol::crypto::SecretKey;
use tally_protocol::storage::LedgerDB;
use tally_protocol::treasury::PayoutLog;
use tally_protocol::Address;

use cli::{Commands, TallyNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Ledger directory inside the data directory.
const LEDGER_DIR: &str = "ledger";

/// Key file written by `init`.
const KEY_FILE: &str = "user.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Keygen(args) => keygen(args),
        Commands::SignWithdrawal(args) => sign_withdrawal(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn open_ledger(data_dir: &Path) -> Result<LedgerDB> {
    let db_path = data_dir.join(LEDGER_DIR);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create ledger directory: {}", db_path.display()))?;
    LedgerDB::open(&db_path)
        .with_context(|| format!("failed to open ledger at {}", db_path.display()))
}

/// Serves the API and metrics endpoints until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "tally_node=info,tally_contracts=info,tower_http=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    if !is_known_network(&args.network) {
        anyhow::bail!("unknown network {:?}", args.network);
    }

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        network = %args.network,
        data_dir = %args.data_dir.display(),
        "starting tally-node"
    );

    // --- Ledger ---
    let db = open_ledger(&args.data_dir)?;
    let user_count = tally_protocol::storage::Store::user_count(&db)
        .context("failed to read the registry")?;
    tracing::info!(users = user_count, "ledger opened");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics
        .users_registered
        .set(i64::try_from(user_count).unwrap_or(i64::MAX));

    // --- Application state ---
    let app_state = api::AppState::new(
        format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        args.network.clone(),
        db,
        PayoutLog::unlimited(),
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    // Every commit already flushed; this only catches sled's own metadata.
    if let Err(e) = app_state.contract.lock().store().flush() {
        tracing::warn!("final ledger flush failed: {}", e);
    }
    tracing::info!("tally-node stopped");
    Ok(())
}

/// Creates the data directory and ledger, and writes a fresh user key.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("tally_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    let db = open_ledger(data_dir)?;
    db.flush().context("failed to flush new ledger")?;

    let key_path = data_dir.join(KEY_FILE);
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            key_path.display()
        );
    }
    let sk = SecretKey::generate();
    keys::write_key_file(&key_path, &sk)?;
    let public_key = sk.public_key().to_hex();

    tracing::info!(
        public_key = %public_key,
        key_path = %key_path.display(),
        "user key generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Ledger         : {}", data_dir.join(LEDGER_DIR).display());
    println!("  User key       : {}", key_path.display());
    println!("  Public key     : {}", public_key);

    Ok(())
}

/// Prints a public key, proof of possession and `register` calldata.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let address: Address = args
        .address
        .parse()
        .with_context(|| format!("invalid address {:?}", args.address))?;

    let sk = match (&args.key_file, &args.seed) {
        (Some(path), _) => keys::read_key_file(path)?,
        (None, Some(seed)) => SecretKey::from_seed(seed.as_bytes()),
        (None, None) => SecretKey::generate(),
    };
    if let Some(out) = &args.out {
        keys::write_key_file(out, &sk)?;
        eprintln!("key written to {}", out.display());
    }

    let calldata = keys::registration_calldata(&sk, address)?;
    println!("address     : {}", address);
    println!("public key  : {}", sk.public_key().to_hex());
    println!("calldata    : 0x{}", hex::encode(calldata));
    Ok(())
}

/// Prints signed `initWithdraw` calldata.
fn sign_withdrawal(args: cli::SignWithdrawalArgs) -> Result<()> {
    let sk = keys::read_key_file(&args.key_file)?;
    let calldata = keys::withdrawal_calldata(&sk, args.index, args.nonce, args.amount)?;
    println!("0x{}", hex::encode(calldata));
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }
    Ok(())
}

/// Host, port and path of a plain `http://` URL.
fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    if rest.starts_with("https://") {
        anyhow::bail!("https is not supported by the status probe");
    }

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("bad port in {:?}", url))?,
        ),
        None => (authority, 80),
    };
    if host.is_empty() {
        anyhow::bail!("missing host in {:?}", url);
    }
    Ok((host.to_string(), port, path.to_string()))
}

/// Minimal HTTP/1.1 GET over a raw TCP stream; returns the body.
async fn http_get(url: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (host, port, path) = split_url(url)?;
    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    Ok(response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_else(|| response.to_string()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("tally-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", PROTOCOL_VERSION);
    println!("curve      {}", tally_protocol::config::BLS_CURVE);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_url_defaults() {
        assert_eq!(
            split_url("http://127.0.0.1:9841/status").unwrap(),
            ("127.0.0.1".to_string(), 9841, "/status".to_string())
        );
        assert_eq!(
            split_url("localhost").unwrap(),
            ("localhost".to_string(), 80, "/".to_string())
        );
    }

    #[test]
    fn split_url_rejects_garbage() {
        assert!(split_url("http://host:port/x").is_err());
        assert!(split_url("https://secure.example").is_err());
        assert!(split_url("http://:80/").is_err());
    }

    #[test]
    fn ledger_opens_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_ledger(dir.path()).unwrap();
        assert_eq!(tally_protocol::storage::Store::user_count(&db).unwrap(), 0);
        assert!(dir.path().join(LEDGER_DIR).is_dir());
    }
}
