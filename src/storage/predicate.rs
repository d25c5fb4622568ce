//! Predicates
//!
//! Composable boolean conditions over transaction fields. Adapters either
//! evaluate them in-process ([`Predicate::matches`]) or compile them into
//! their own query language.

use crate::domain::{TimeWindow, Transaction};

/// A queryable transaction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Sender,
    Receiver,
    Timestamp,
    Sum,
}

impl Field {
    /// Field name as it appears in documents and index names
    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Sender => "sender",
            Field::Receiver => "receiver",
            Field::Timestamp => "timestamp",
            Field::Sum => "sum",
        }
    }

    /// Integer value of the field, `None` for the identifier
    pub fn value(&self, tx: &Transaction) -> Option<i64> {
        match self {
            Field::Id => None,
            Field::Sender => Some(tx.sender),
            Field::Receiver => Some(tx.receiver),
            Field::Timestamp => Some(tx.timestamp),
            Field::Sum => Some(tx.sum),
        }
    }

    fn is_present(&self, tx: &Transaction) -> bool {
        match self {
            Field::Id => tx.id.is_some(),
            _ => true,
        }
    }
}

/// A boolean condition over a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field is set
    Exists(Field),
    /// `field == value`
    Eq(Field, i64),
    /// `field >= value`
    Gte(Field, i64),
    /// `field < value`
    Lt(Field, i64),
    /// All conditions hold; empty is true
    And(Vec<Predicate>),
    /// At least one condition holds; empty is false
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Matches every stored transaction.
    pub fn any_stored() -> Self {
        Predicate::Exists(Field::Id)
    }

    /// `sender == account OR receiver == account`
    pub fn involves(account: i64) -> Self {
        Predicate::Or(vec![
            Predicate::Eq(Field::Sender, account),
            Predicate::Eq(Field::Receiver, account),
        ])
    }

    /// `window.start <= field < window.end`
    pub fn within(field: Field, window: TimeWindow) -> Self {
        Predicate::And(vec![
            Predicate::Gte(field, window.start),
            Predicate::Lt(field, window.end),
        ])
    }

    /// Conjunction with `other`, flattening nested `And`s.
    pub fn and(self, other: Predicate) -> Self {
        let mut clauses = match self {
            Predicate::And(clauses) => clauses,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => clauses.extend(more),
            single => clauses.push(single),
        }
        Predicate::And(clauses)
    }

    /// Evaluate against a transaction.
    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            Predicate::Exists(field) => field.is_present(tx),
            Predicate::Eq(field, value) => field.value(tx) == Some(*value),
            Predicate::Gte(field, value) => field.value(tx).is_some_and(|v| v >= *value),
            Predicate::Lt(field, value) => field.value(tx).is_some_and(|v| v < *value),
            Predicate::And(clauses) => clauses.iter().all(|p| p.matches(tx)),
            Predicate::Or(clauses) => clauses.iter().any(|p| p.matches(tx)),
        }
    }
}
