//! HTTP API for balances, sends, transaction lookups and estimates

use crate::config::ApiConfig;
use crate::engine::{SendReceipt, TransactionEngine};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerStore, TransactionRecord};
use crate::oracle::{ChainCost, GasPriceOracle};
use crate::routing::{ChainSelector, Selection};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub engine: Arc<TransactionEngine>,
    pub selector: ChainSelector,
    pub oracle: GasPriceOracle,
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> LedgerResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LedgerError::Internal(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| LedgerError::Internal(e.to_string()))?;

    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/balance/:user_id", get(get_balance))
        .route("/send", post(send))
        .route("/transaction/:tx_hash", get(get_transaction))
        .route("/gas-prices", get(get_gas_prices))
        .route("/estimate", post(estimate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Error wrapper that maps the ledger taxonomy onto HTTP statuses
struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::UserNotFound { .. } | LedgerError::TransactionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody {
            error: self.0.to_string(),
        }))
            .into_response()
    }
}

// Handlers

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    if state.ledger.get_user(&user_id).await?.is_none() {
        return Err(LedgerError::UserNotFound { user_id }.into());
    }

    let sheet = state.ledger.totals(&user_id).await?;

    Ok(Json(BalanceResponse {
        user_id,
        total_balance: (sheet.total * 100.0).round() / 100.0,
        balances_by_chain: sheet
            .by_chain
            .into_iter()
            .map(|(chain, amount)| (chain.as_str().to_string(), amount))
            .collect(),
    }))
}

async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendReceipt>, ApiError> {
    let receipt = state.engine.send(&req.from, &req.to, req.amount).await?;
    Ok(Json(receipt))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<TransactionRecord>, ApiError> {
    let record = state.engine.get_status(&tx_hash).await?;
    Ok(Json(record))
}

async fn get_gas_prices(State(state): State<AppState>) -> Json<GasPricesResponse> {
    Json(GasPricesResponse {
        gas_costs: state.oracle.all_costs(),
    })
}

async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<Selection>, ApiError> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(LedgerError::InvalidAmount { amount: req.amount }.into());
    }
    let selection = state.selector.select_chain(&req.user_id, req.amount).await?;
    Ok(Json(selection))
}

// Request/response types

#[derive(Deserialize)]
struct SendRequest {
    to: String,
    from: String,
    amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateRequest {
    user_id: String,
    amount: f64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    user_id: String,
    total_balance: f64,
    balances_by_chain: std::collections::HashMap<String, f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GasPricesResponse {
    gas_costs: Vec<ChainCost>,
}
