//! Shared router state

use std::sync::Arc;

use axum::extract::FromRef;

use crate::handlers::{BalanceAggregator, QueryBuilder, TransactionStore};
use crate::storage::TransactionCollection;

/// The state of the REST server.
///
/// Every handler holds a clone of the same collection handle.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: TransactionStore,
    pub queries: QueryBuilder,
    pub balances: BalanceAggregator,
}

impl AppState {
    pub fn new(collection: Arc<dyn TransactionCollection>) -> Self {
        Self {
            store: TransactionStore::new(collection.clone()),
            queries: QueryBuilder::new(collection.clone()),
            balances: BalanceAggregator::new(collection),
        }
    }
}
