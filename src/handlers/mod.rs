//! Handlers module
//!
//! The ledger's three operations: create, filtered listing and balance
//! aggregation. Each handler is constructed with the shared collection
//! handle and holds no other state.

mod balance_aggregator;
mod commands;
mod query_builder;
mod transaction_store;

#[cfg(test)]
mod tests;

pub use balance_aggregator::{balance_pipeline, BalanceAggregator};
pub use commands::*;
pub use query_builder::{account_index, QueryBuilder};
pub use transaction_store::TransactionStore;
