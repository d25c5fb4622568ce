//! Aggregation pipelines and index declarations

use serde::{Deserialize, Serialize};

use super::{Field, Predicate, StorageError};
use crate::domain::Transaction;

/// Options for a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub unique: bool,
    /// Omit documents lacking the indexed fields
    pub sparse: bool,
    /// Build without blocking readers and writers
    pub background: bool,
}

/// A secondary index over an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<Field>,
    pub options: IndexOptions,
}

impl IndexSpec {
    pub fn new(keys: Vec<Field>, options: IndexOptions) -> Self {
        Self { keys, options }
    }

    /// Name derived from the key list, e.g. `sender_1_receiver_1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|field| format!("{}_1", field.name()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Reducer applied to every document of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    /// Sums `sum`, adding it when `add_when` holds and subtracting it when
    /// `subtract_when` holds. A document matching both contributes zero.
    NetSum {
        add_when: Predicate,
        subtract_when: Predicate,
    },
}

impl Accumulator {
    /// Signed contribution of one transaction.
    pub fn contribution(&self, tx: &Transaction) -> i128 {
        match self {
            Accumulator::NetSum {
                add_when,
                subtract_when,
            } => {
                let mut delta = 0i128;
                if add_when.matches(tx) {
                    delta += i128::from(tx.sum);
                }
                if subtract_when.matches(tx) {
                    delta -= i128::from(tx.sum);
                }
                delta
            }
        }
    }
}

/// Collapses all remaining documents into one row under a constant key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: i64,
    pub accumulator: Accumulator,
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Match(Predicate),
    Group(Group),
}

/// A grouped aggregation result.
///
/// A group only exists when at least one document reached it, so an
/// aggregation over no documents yields no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(rename = "_id")]
    pub key: i64,
    pub balance: i64,
}

/// Split a pipeline into its combined filter and terminal group.
///
/// Supported shape: any number of `Match` stages followed by exactly one
/// `Group` stage.
pub fn split_pipeline(stages: &[Stage]) -> Result<(Predicate, &Group), StorageError> {
    let (last, matches) = stages
        .split_last()
        .ok_or_else(|| StorageError::UnsupportedPipeline("empty pipeline".to_string()))?;

    let group = match last {
        Stage::Group(group) => group,
        Stage::Match(_) => {
            return Err(StorageError::UnsupportedPipeline(
                "pipeline must end with a group stage".to_string(),
            ))
        }
    };

    let mut filter = Predicate::And(Vec::new());
    for stage in matches {
        match stage {
            Stage::Match(predicate) => filter = filter.and(predicate.clone()),
            Stage::Group(_) => {
                return Err(StorageError::UnsupportedPipeline(
                    "group stage must be last".to_string(),
                ))
            }
        }
    }

    Ok((filter, group))
}
