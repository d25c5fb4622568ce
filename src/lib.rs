//! transacto Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod storage;
mod error;

pub use config::{Config, StorageConfig};
pub use domain::{DomainError, NewTransaction, TimeWindow, Transaction};
pub use error::{AppError, AppResult};
