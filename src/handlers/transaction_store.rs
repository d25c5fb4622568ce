//! Transaction Store
//!
//! Validates and persists new ledger records.

use std::sync::Arc;

use crate::domain::{NewTransaction, Transaction};
use crate::error::AppError;
use crate::storage::TransactionCollection;

/// Handler for creating transactions
#[derive(Clone)]
pub struct TransactionStore {
    collection: Arc<dyn TransactionCollection>,
}

impl TransactionStore {
    pub fn new(collection: Arc<dyn TransactionCollection>) -> Self {
        Self { collection }
    }

    /// Validate `input` and insert it.
    ///
    /// Returns the input with the identifier assigned by the collection.
    /// Nothing is written when validation fails, and storage errors are
    /// returned without retrying.
    pub async fn create(&self, input: NewTransaction) -> Result<Transaction, AppError> {
        input.validate()?;

        let id = self.collection.insert_one(input).await?;

        tracing::debug!(
            %id,
            sender = input.sender,
            receiver = input.receiver,
            sum = input.sum,
            "Transaction stored"
        );

        Ok(input.into_stored(id))
    }
}
