//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::domain::{NewTransaction, Transaction};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    BalanceAggregator, BalanceParams, ListFilter, ListParams, QueryBuilder, QueryPairs,
    TransactionStore,
};
use crate::storage::AggregateRow;

use super::AppState;

/// Decode the first JSON value of `body`.
///
/// Bytes after the first value are ignored and a `null` document decodes
/// as the default (all-zero) payload.
fn decode_first<T>(body: &[u8]) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    let value = serde_json::Deserializer::from_slice(body)
        .into_iter::<Option<T>>()
        .next()
        .ok_or_else(|| AppError::MalformedBody("EOF".to_string()))?
        .map_err(|e| AppError::MalformedBody(e.to_string()))?;

    Ok(value.unwrap_or_default())
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
///
/// Collection paths are served with and without the trailing slash.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route(
            "/transactions/",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/balance/", get(get_balance))
        .route("/balance", get(get_balance))
}

/// Route name for request logs
pub fn route_name(method: &str, path: &str) -> &'static str {
    match (method, path.trim_end_matches('/')) {
        ("GET", "") => "Index",
        ("POST", "/transactions") => "TransactionCreate",
        ("GET", "/transactions") => "TransactionList",
        ("GET", "/balance") => "BalanceList",
        ("GET", "/health") => "Health",
        _ => "Unknown",
    }
}

// =========================================================================
// GET /
// =========================================================================

async fn index() -> impl IntoResponse {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/transactions/")],
    )
}

// =========================================================================
// POST /transactions/
// =========================================================================

/// Record a transfer
async fn create_transaction(
    State(store): State<TransactionStore>,
    body: Bytes,
) -> AppResult<Json<Transaction>> {
    let input: NewTransaction = decode_first(&body)?;

    let transaction = store.create(input).await?;

    Ok(Json(transaction))
}

// =========================================================================
// GET /transactions/
// =========================================================================

/// List transactions, optionally filtered by `user`, `day` and `threshold`
async fn list_transactions(
    State(queries): State<QueryBuilder>,
    Query(pairs): Query<QueryPairs>,
) -> AppResult<Json<Vec<Transaction>>> {
    let filter = ListFilter::from(&ListParams::from_pairs(&pairs));

    let transactions = queries.list_filtered(&filter).await?;

    Ok(Json(transactions))
}

// =========================================================================
// GET /balance/
// =========================================================================

/// Net balance of `user` over `[since, until)`
async fn get_balance(
    State(balances): State<BalanceAggregator>,
    Query(pairs): Query<QueryPairs>,
) -> AppResult<Json<Vec<AggregateRow>>> {
    let rows = balances
        .compute_balance(&BalanceParams::from_pairs(&pairs))
        .await?;

    Ok(Json(rows))
}
