//! In-memory collection
//!
//! Evaluates predicates and pipelines in-process. Used by the test suite
//! and for running the service without a database.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    split_pipeline, AggregateRow, IndexSpec, Predicate, Stage, StorageError,
    TransactionCollection,
};
use crate::domain::{NewTransaction, Transaction};

/// Collection backed by a `Vec` in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    records: RwLock<Vec<Transaction>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes declared so far, in declaration order
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes
            .read()
            .map(|indexes| indexes.clone())
            .unwrap_or_default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("memory collection lock poisoned".to_string())
}

#[async_trait]
impl TransactionCollection for MemoryCollection {
    async fn insert_one(&self, record: NewTransaction) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();
        self.records
            .write()
            .map_err(poisoned)?
            .push(record.into_stored(id));
        Ok(id)
    }

    async fn find_all(&self, predicate: &Predicate) -> Result<Vec<Transaction>, StorageError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|tx| predicate.matches(tx))
            .cloned()
            .collect())
    }

    async fn ensure_index(&self, index: &IndexSpec) -> Result<(), StorageError> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;

        if let Some(existing) = indexes.iter().find(|i| i.keys == index.keys) {
            if existing.options != index.options {
                return Err(StorageError::IndexConflict { name: index.name() });
            }
            return Ok(());
        }

        tracing::debug!(index = %index.name(), "Declared index");
        indexes.push(index.clone());
        Ok(())
    }

    async fn aggregate(&self, stages: &[Stage]) -> Result<Vec<AggregateRow>, StorageError> {
        let (filter, group) = split_pipeline(stages)?;
        let records = self.records.read().map_err(poisoned)?;

        let mut matched = 0usize;
        let mut total = 0i128;
        for tx in records.iter().filter(|tx| filter.matches(tx)) {
            matched += 1;
            total += group.accumulator.contribution(tx);
        }

        if matched == 0 {
            return Ok(Vec::new());
        }

        let balance = i64::try_from(total).map_err(|_| StorageError::Overflow(group.key))?;
        Ok(vec![AggregateRow {
            key: group.key,
            balance,
        }])
    }
}
