//! Balance Aggregator
//!
//! Net balance of one account over a half-open time window, computed by
//! the collection's aggregation pipeline.

use std::sync::Arc;

use crate::domain::TimeWindow;
use crate::error::AppError;
use crate::storage::{
    Accumulator, AggregateRow, Field, Group, Predicate, Stage, TransactionCollection,
};

use super::query_builder::account_index;
use super::{BalanceParams, BalanceQuery};

/// Pipeline for `query`: match transfers involving the account within the
/// window, then group them under the account id.
///
/// Sent amounts count positive and received amounts negative; a transfer
/// from the account to itself counts both ways and nets to zero.
pub fn balance_pipeline(query: &BalanceQuery) -> Vec<Stage> {
    vec![
        Stage::Match(Predicate::involves(query.user).and(Predicate::within(
            Field::Timestamp,
            TimeWindow::new(query.since, query.until),
        ))),
        Stage::Group(Group {
            key: query.user,
            accumulator: Accumulator::NetSum {
                add_when: Predicate::Eq(Field::Sender, query.user),
                subtract_when: Predicate::Eq(Field::Receiver, query.user),
            },
        }),
    ]
}

/// Handler for balance aggregation
#[derive(Clone)]
pub struct BalanceAggregator {
    collection: Arc<dyn TransactionCollection>,
}

impl BalanceAggregator {
    pub fn new(collection: Arc<dyn TransactionCollection>) -> Self {
        Self { collection }
    }

    /// Parse `params` and compute the balance.
    ///
    /// Fails with `MissingParameter` before touching storage when any of
    /// `user`, `since` or `until` is absent or not an integer.
    pub async fn compute_balance(&self, params: &BalanceParams) -> Result<Vec<AggregateRow>, AppError> {
        let query = BalanceQuery::try_from(params)?;
        self.compute(query).await
    }

    /// Zero rows when no transaction matches, otherwise one row keyed by
    /// the account.
    pub async fn compute(&self, query: BalanceQuery) -> Result<Vec<AggregateRow>, AppError> {
        self.collection.ensure_index(&account_index()).await?;

        let rows = self.collection.aggregate(&balance_pipeline(&query)).await?;

        tracing::debug!(
            user = query.user,
            since = query.since,
            until = query.until,
            rows = rows.len(),
            "Balance computed"
        );

        Ok(rows)
    }
}
