// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the receipt contract over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Description                           |
//! |--------|---------------------------|---------------------------------------|
//! | GET    | `/health`                 | Liveness probe                        |
//! | GET    | `/status`                 | Node status summary                   |
//! | POST   | `/rpc`                    | JSON-RPC 2.0 gateway                  |
//! | POST   | `/calls`                  | Execute hex calldata                  |
//! | GET    | `/users/:index`           | Registry entry                        |
//! | GET    | `/accounts/:index`        | Balance, nonce and security deposit   |
//! | GET    | `/records/:payer/:payee`  | Last settled sequence number          |
//! | GET    | `/withdrawals/:index`     | Pending withdrawal                    |
//! | POST   | `/devnet/fund`            | Operator funding (devnet only)        |
//!
//! Token amounts are `u128` and are rendered as decimal strings; JSON
//! numbers cannot carry them.
//!
//! ## Concurrency
//!
//! The contract sits behind a single `parking_lot::Mutex`. Every call runs
//! to completion under the lock, so calls are linearized in lock order and
//! index allocation and sequence numbers need nothing more. The lock is
//! never held across an `.await`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tally_contracts::{CallOutcome, ContractError, Executed, ReceiptContract};
use tally_protocol::clock::{Clock, SystemClock};
use tally_protocol::config::{allows_operator_funding, PROTOCOL_FINGERPRINT};
use tally_protocol::storage::LedgerDB;
use tally_protocol::treasury::PayoutLog;
use tally_protocol::wire::Call;
use tally_protocol::UserIndex;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The contract as the node hosts it.
pub type NodeContract = ReceiptContract<LedgerDB, SystemClock, PayoutLog>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network identifier (e.g., "devnet", "testnet", "mainnet").
    pub network: String,
    /// The single writer over the ledger.
    pub contract: Arc<Mutex<NodeContract>>,
    /// Handle on the contract's treasury, for reporting payouts.
    pub treasury: PayoutLog,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        version: String,
        network: String,
        db: LedgerDB,
        treasury: PayoutLog,
        metrics: SharedMetrics,
    ) -> Self {
        let contract = ReceiptContract::new(db, SystemClock, treasury.clone());
        Self {
            version,
            network,
            contract: Arc::new(Mutex::new(contract)),
            treasury,
            metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the axum `Router` with all API routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/calls", post(call_handler))
        .route("/users/:index", get(user_handler))
        .route("/accounts/:index", get(account_handler))
        .route("/records/:payer/:payee", get(record_handler))
        .route("/withdrawals/:index", get(withdrawal_handler))
        .route("/devnet/fund", post(fund_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Request is not JSON-RPC 2.0.
pub const RPC_INVALID_REQUEST: i32 = -32600;
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;
pub const RPC_INVALID_PARAMS: i32 = -32602;
pub const RPC_INTERNAL_ERROR: i32 = -32603;
/// The requested entry does not exist.
pub const RPC_NOT_FOUND: i32 = -32001;
/// The contract rejected the call. `data.kind` carries the reason.
pub const RPC_CALL_REJECTED: i32 = -32002;

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn from_contract(err: &ContractError) -> Self {
        match err {
            ContractError::Storage(e) => {
                Self::new(RPC_INTERNAL_ERROR, format!("Internal error: {}", e))
            }
            other => Self {
                code: RPC_CALL_REJECTED,
                message: other.to_string(),
                data: Some(serde_json::json!({ "kind": other.kind() })),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// REST types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Protocol fingerprint of the ledger format and signing domain.
    pub protocol: String,
    pub network: String,
    pub user_count: u64,
    /// Contract clock, seconds since the Unix epoch.
    pub now: u64,
    /// Expiry a batch posted now would be bound to.
    pub cycle_expiry: u32,
    /// Total paid out by the treasury since start-up.
    pub paid_out: String,
    /// Approximate ledger size on disk, in bytes.
    pub ledger_bytes: u64,
    /// Wall-clock time of the response, RFC 3339.
    pub timestamp: String,
}

/// Request body for `POST /calls`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallRequest {
    /// Hex calldata, selector included. A `0x` prefix is accepted.
    pub calldata: String,
}

/// Response payload for an executed call.
#[derive(Debug, Serialize)]
pub struct CallResponse {
    /// Request-scoped identifier, also attached to the log line.
    pub id: String,
    pub call: &'static str,
    pub outcome: CallOutcome,
    /// Storage entries written by the commit.
    pub entries: usize,
    /// Hex BLAKE3 digest of the committed change set.
    pub digest: String,
}

/// Response payload for `GET /users/:index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub index: UserIndex,
    pub address: String,
    /// Hex of the four 32-byte public key words.
    pub public_key: String,
}

/// Response payload for `GET /accounts/:index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub index: UserIndex,
    pub balance: String,
    pub nonce: u64,
    pub security_deposit: String,
}

/// Response payload for `GET /records/:payer/:payee`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub payer: UserIndex,
    pub payee: UserIndex,
    /// Last settled sequence number; the next receipt must carry `seq_no + 1`.
    pub seq_no: u64,
}

/// Response payload for `GET /withdrawals/:index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub index: UserIndex,
    pub pending: bool,
    pub amount: String,
    pub valid_after: u64,
    /// `true` if `processWithdrawal` would pass the timelock right now.
    pub ready: bool,
}

/// Request body for `POST /devnet/fund`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FundRequest {
    pub index: UserIndex,
    /// Amount to credit to the balance.
    #[serde(default)]
    pub balance: Option<String>,
    /// Amount to add to the security deposit.
    #[serde(default)]
    pub deposit: Option<String>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Contract rejection reason, when the contract rejected the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        kind: None,
    };
    (status, Json(body)).into_response()
}

fn contract_error_response(err: &ContractError) -> Response {
    let status = match err {
        ContractError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ContractError::MalformedCalldata(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let body = ErrorResponse {
        error: err.to_string(),
        kind: Some(err.kind().to_string()),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Shared operations
// ---------------------------------------------------------------------------
//
// Each REST handler and its JSON-RPC twin go through the same function.

/// Client input that could not be parsed.
#[derive(Debug)]
enum InputError {
    Hex(hex::FromHexError),
    Amount(String),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Hex(e) => write!(f, "calldata is not valid hex: {}", e),
            InputError::Amount(s) => write!(f, "not a valid amount: {:?}", s),
        }
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, InputError> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(InputError::Hex)
}

fn parse_amount(s: &str) -> Result<u128, InputError> {
    s.trim()
        .parse::<u128>()
        .map_err(|_| InputError::Amount(s.to_string()))
}

/// Decode and execute one call, recording metrics.
fn run_call(state: &AppState, calldata: &[u8]) -> Result<CallResponse, ContractError> {
    let started = Instant::now();
    let id = uuid::Uuid::new_v4().to_string();

    let call = match Call::decode(calldata) {
        Ok(call) => call,
        Err(err) => {
            let err = ContractError::from(err);
            tracing::warn!(%id, error = %err, "calldata rejected");
            state
                .metrics
                .observe_call("malformed", Err(&err), started.elapsed());
            return Err(err);
        }
    };
    let name = call.name();

    let result = state.contract.lock().dispatch(call);
    state
        .metrics
        .observe_call(name, result.as_ref(), started.elapsed());

    let Executed {
        call,
        outcome,
        commit,
    } = result?;
    tracing::info!(%id, call, entries = commit.entries, "call executed");
    Ok(CallResponse {
        id,
        call,
        outcome,
        entries: commit.entries,
        digest: hex::encode(commit.digest),
    })
}

fn load_user(state: &AppState, index: UserIndex) -> Result<Option<UserResponse>, ContractError> {
    let contract = state.contract.lock();
    let address = contract.user_address(index)?;
    let public_key = contract.user_public_key(index)?;
    Ok(address.zip(public_key).map(|(address, public_key)| UserResponse {
        index,
        address: address.to_hex(),
        public_key: public_key.to_hex(),
    }))
}

fn load_account(state: &AppState, index: UserIndex) -> Result<AccountResponse, ContractError> {
    let contract = state.contract.lock();
    let account = contract.account(index)?;
    let deposit = contract.security_deposit(index)?;
    Ok(AccountResponse {
        index,
        balance: account.balance.to_string(),
        nonce: account.nonce,
        security_deposit: deposit.to_string(),
    })
}

fn load_record(
    state: &AppState,
    payer: UserIndex,
    payee: UserIndex,
) -> Result<RecordResponse, ContractError> {
    let seq_no = state.contract.lock().record(payer, payee)?;
    Ok(RecordResponse {
        payer,
        payee,
        seq_no,
    })
}

fn load_withdrawal(state: &AppState, index: UserIndex) -> Result<WithdrawalResponse, ContractError> {
    let contract = state.contract.lock();
    let pending = contract.pending_withdrawal(index)?;
    let now = contract.clock().now();
    Ok(WithdrawalResponse {
        index,
        pending: pending.is_pending(),
        amount: pending.amount.to_string(),
        valid_after: pending.valid_after,
        ready: pending.is_ready(now),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns node status summary.
async fn status_handler(State(state): State<AppState>) -> Response {
    let (user_count, ledger_bytes, now, cycle_expiry) = {
        let contract = state.contract.lock();
        let sizes = contract
            .user_count()
            .and_then(|count| Ok((count, contract.store().size_on_disk()?)));
        match sizes {
            Ok((count, bytes)) => (
                count,
                bytes,
                contract.clock().now(),
                contract.current_cycle_expiry(),
            ),
            Err(err) => return contract_error_response(&err),
        }
    };

    Json(StatusResponse {
        version: state.version.clone(),
        protocol: PROTOCOL_FINGERPRINT.to_string(),
        network: state.network.clone(),
        user_count,
        now,
        cycle_expiry,
        paid_out: state.treasury.total_paid().to_string(),
        ledger_bytes,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

/// `POST /calls`: executes one call from hex calldata.
///
/// 200 with the outcome on success, 400 for undecodable input, 422 when
/// the contract rejects the call.
async fn call_handler(State(state): State<AppState>, Json(req): Json<CallRequest>) -> Response {
    let calldata = match decode_hex(&req.calldata) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match run_call(&state, &calldata) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(err) => contract_error_response(&err),
    }
}

/// `GET /users/:index`: returns a registry entry.
async fn user_handler(Path(index): Path<u64>, State(state): State<AppState>) -> Response {
    match load_user(&state, index) {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("User not found: {}", index)),
        Err(err) => contract_error_response(&err),
    }
}

/// `GET /accounts/:index`: returns balance, nonce and deposit.
///
/// Accounts that were never touched read as zero, like the ledger itself.
async fn account_handler(Path(index): Path<u64>, State(state): State<AppState>) -> Response {
    match load_account(&state, index) {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(err) => contract_error_response(&err),
    }
}

/// `GET /records/:payer/:payee`: returns the last settled sequence number.
async fn record_handler(
    Path((payer, payee)): Path<(u64, u64)>,
    State(state): State<AppState>,
) -> Response {
    match load_record(&state, payer, payee) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => contract_error_response(&err),
    }
}

/// `GET /withdrawals/:index`: returns the pending withdrawal, if any.
async fn withdrawal_handler(Path(index): Path<u64>, State(state): State<AppState>) -> Response {
    match load_withdrawal(&state, index) {
        Ok(w) => (StatusCode::OK, Json(w)).into_response(),
        Err(err) => contract_error_response(&err),
    }
}

/// `POST /devnet/fund`: credits balance and/or security deposit.
///
/// Stands in for the base ledger's deposit path, so it only exists on
/// devnet. The two amounts are applied as two separate calls, balance
/// first.
async fn fund_handler(State(state): State<AppState>, Json(req): Json<FundRequest>) -> Response {
    if !allows_operator_funding(&state.network) {
        return error_response(
            StatusCode::FORBIDDEN,
            format!("operator funding is disabled on {}", state.network),
        );
    }

    let parse = |s: &Option<String>| s.as_deref().map(parse_amount).transpose();
    let (balance, deposit) = match (parse(&req.balance), parse(&req.deposit)) {
        (Ok(balance), Ok(deposit)) => (balance, deposit),
        (Err(e), _) | (_, Err(e)) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    {
        let mut contract = state.contract.lock();
        if let Some(amount) = balance {
            if let Err(err) = contract.fund_account(req.index, amount) {
                return contract_error_response(&err);
            }
        }
        if let Some(amount) = deposit {
            if let Err(err) = contract.post_security_deposit(req.index, amount) {
                return contract_error_response(&err);
            }
        }
    }

    tracing::info!(index = req.index, ?balance, ?deposit, "devnet funding applied");
    match load_account(&state, req.index) {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(err) => contract_error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC
// ---------------------------------------------------------------------------

/// Positional `u64` parameter `i`.
fn param_u64(params: &Option<serde_json::Value>, i: usize) -> Option<u64> {
    params
        .as_ref()
        .and_then(|p| p.as_array())
        .and_then(|arr| arr.get(i))
        .and_then(|v| v.as_u64())
}

fn param_str(params: &Option<serde_json::Value>, i: usize) -> Option<&str> {
    params
        .as_ref()
        .and_then(|p| p.as_array())
        .and_then(|arr| arr.get(i))
        .and_then(|v| v.as_str())
}

fn to_result<T: Serialize>(value: Result<T, ContractError>) -> Result<serde_json::Value, JsonRpcError> {
    let value = value.map_err(|e| JsonRpcError::from_contract(&e))?;
    // `Value` cannot hold integers past u64::MAX. Going through text keeps
    // such amounts, as floats.
    serde_json::to_value(&value)
        .or_else(|_| serde_json::to_string(&value).and_then(|s| serde_json::from_str(&s)))
        .map_err(|e| JsonRpcError::new(RPC_INTERNAL_ERROR, format!("Internal error: {}", e)))
}

fn dispatch_rpc(
    state: &AppState,
    method: &str,
    params: &Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let index_param = |what: &str| {
        param_u64(params, 0).ok_or_else(|| {
            JsonRpcError::new(RPC_INVALID_PARAMS, format!("Invalid params: expected [{}]", what))
        })
    };

    match method {
        "tally_version" => Ok(serde_json::json!(state.version)),
        "tally_networkId" => Ok(serde_json::json!(state.network)),
        "tally_userCount" => to_result(state.contract.lock().user_count()),
        "tally_cycleExpiry" => Ok(serde_json::json!(state.contract.lock().current_cycle_expiry())),
        "tally_call" => {
            let hex = param_str(params, 0).ok_or_else(|| {
                JsonRpcError::new(RPC_INVALID_PARAMS, "Invalid params: expected [calldata]")
            })?;
            let calldata = decode_hex(hex)
                .map_err(|e| JsonRpcError::new(RPC_INVALID_PARAMS, format!("Invalid params: {}", e)))?;
            to_result(run_call(state, &calldata))
        }
        "tally_getUser" => {
            let index = index_param("index")?;
            match load_user(state, index) {
                Ok(None) => Err(JsonRpcError::new(
                    RPC_NOT_FOUND,
                    format!("User not found: {}", index),
                )),
                other => to_result(other),
            }
        }
        "tally_getAccount" => to_result(load_account(state, index_param("index")?)),
        "tally_getWithdrawal" => to_result(load_withdrawal(state, index_param("index")?)),
        "tally_getRecord" => {
            let (payer, payee) = param_u64(params, 0)
                .zip(param_u64(params, 1))
                .ok_or_else(|| {
                    JsonRpcError::new(RPC_INVALID_PARAMS, "Invalid params: expected [payer, payee]")
                })?;
            to_result(load_record(state, payer, payee))
        }
        _ => Err(JsonRpcError::new(
            RPC_METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let outcome = if req.jsonrpc != "2.0" {
        Err(JsonRpcError::new(
            RPC_INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ))
    } else {
        dispatch_rpc(&state, &req.method, &req.params)
    };

    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };
    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
