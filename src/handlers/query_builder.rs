//! Query Builder
//!
//! Turns listing filters into a collection predicate and keeps the
//! account index in place for account-scoped queries.

use std::sync::Arc;

use crate::domain::{TimeWindow, Transaction};
use crate::error::AppError;
use crate::storage::{Field, IndexOptions, IndexSpec, Predicate, TransactionCollection};

use super::ListFilter;

/// Non-unique sparse index on `(sender, receiver)`, built in the background.
///
/// Shared by account-filtered listings and balance aggregation.
pub fn account_index() -> IndexSpec {
    IndexSpec::new(
        vec![Field::Sender, Field::Receiver],
        IndexOptions {
            unique: false,
            sparse: true,
            background: true,
        },
    )
}

impl ListFilter {
    /// The predicate selecting transactions that pass every present filter.
    ///
    /// Always starts from "has an identifier", so an empty filter selects
    /// every stored transaction.
    pub fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::any_stored();

        if let Some(user) = self.user {
            predicate = predicate.and(Predicate::involves(user));
        }

        if let Some(window) = self.day.and_then(TimeWindow::enclosing_day) {
            predicate = predicate.and(Predicate::within(Field::Timestamp, window));
        }

        if let Some(threshold) = self.threshold {
            predicate = predicate.and(Predicate::Gte(Field::Sum, threshold));
        }

        predicate
    }
}

/// Handler for filtered transaction listings
#[derive(Clone)]
pub struct QueryBuilder {
    collection: Arc<dyn TransactionCollection>,
}

impl QueryBuilder {
    pub fn new(collection: Arc<dyn TransactionCollection>) -> Self {
        Self { collection }
    }

    /// Build the predicate for `filter`, ensuring the account index first
    /// when the filter is scoped to an account.
    pub async fn build_filter(&self, filter: &ListFilter) -> Result<Predicate, AppError> {
        if filter.user.is_some() {
            self.collection.ensure_index(&account_index()).await?;
        }
        Ok(filter.predicate())
    }

    /// Every transaction matching `predicate`, in storage order.
    pub async fn list(&self, predicate: &Predicate) -> Result<Vec<Transaction>, AppError> {
        let transactions = self.collection.find_all(predicate).await?;
        tracing::debug!(count = transactions.len(), "Listed transactions");
        Ok(transactions)
    }

    /// [`build_filter`](Self::build_filter) followed by [`list`](Self::list).
    pub async fn list_filtered(&self, filter: &ListFilter) -> Result<Vec<Transaction>, AppError> {
        let predicate = self.build_filter(filter).await?;
        self.list(&predicate).await
    }
}
