//! Storage module
//!
//! The document-collection abstraction the ledger is written against,
//! with a PostgreSQL adapter for production and an in-memory adapter.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction};

mod error;
pub mod memory;
mod pipeline;
pub mod postgres;
mod predicate;

pub use error::StorageError;
pub use memory::MemoryCollection;
pub use pipeline::{
    split_pipeline, Accumulator, AggregateRow, Group, IndexOptions, IndexSpec, Stage,
};
pub use postgres::PgCollection;
pub use predicate::{Field, Predicate};

/// A collection of transaction documents.
///
/// Implementations own identifier assignment, durability and read
/// isolation. Every call completes before it returns; nothing is written
/// in the background.
#[async_trait]
pub trait TransactionCollection: Send + Sync {
    /// Persist one record and return the identifier assigned to it.
    async fn insert_one(&self, record: NewTransaction) -> Result<Uuid, StorageError>;

    /// All records matching `predicate`, in storage order.
    async fn find_all(&self, predicate: &Predicate) -> Result<Vec<Transaction>, StorageError>;

    /// Declare a secondary index. Idempotent.
    async fn ensure_index(&self, index: &IndexSpec) -> Result<(), StorageError>;

    /// Run a staged aggregation (see [`split_pipeline`] for the supported shape).
    async fn aggregate(&self, stages: &[Stage]) -> Result<Vec<AggregateRow>, StorageError>;
}
