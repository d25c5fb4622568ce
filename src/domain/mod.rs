//! Domain module
//!
//! Core domain types and business logic.

pub mod error;
pub mod transaction;
pub mod window;

pub use error::DomainError;
pub use transaction::{NewTransaction, Transaction};
pub use window::TimeWindow;
