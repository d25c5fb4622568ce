//! Transaction type
//!
//! The single ledger record. Transactions are created once and never
//! modified; the storage adapter owns identifier assignment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

/// A stored transfer of `sum` from `sender` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the storage adapter on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub sender: i64,
    pub receiver: i64,
    /// Seconds since the Unix epoch (UTC)
    pub timestamp: i64,
    pub sum: i64,
}

/// A candidate transaction as submitted by a client.
///
/// Missing fields decode as zero, so an omitted `timestamp` or `sum`
/// is caught by [`NewTransaction::validate`]. Any `id` in the payload is
/// ignored; identifiers are never client-assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTransaction {
    pub sender: i64,
    pub receiver: i64,
    pub timestamp: i64,
    pub sum: i64,
}

impl NewTransaction {
    pub fn new(sender: i64, receiver: i64, timestamp: i64, sum: i64) -> Self {
        Self {
            sender,
            receiver,
            timestamp,
            sum,
        }
    }

    /// Check the creation invariants.
    ///
    /// Only `timestamp` and `sum` are checked. Self-transfers and zero
    /// account ids are accepted as-is.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.timestamp == 0 || self.sum == 0 {
            return Err(DomainError::InvalidInput(
                "Invalid post parameters: timestamp and sum are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Attach the identifier the storage adapter assigned.
    pub fn into_stored(self, id: Uuid) -> Transaction {
        Transaction {
            id: Some(id),
            sender: self.sender,
            receiver: self.receiver,
            timestamp: self.timestamp,
            sum: self.sum,
        }
    }
}
