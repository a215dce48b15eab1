//! The module contains the error the engine can throw.
//!
//! Validation failures are detected before any ledger read, precondition
//! failures after the reads but before any write, and [`Ledger`] wraps a
//! storage failure verbatim.
//!
//!  [`Ledger`]: EngineError::Ledger
use thiserror::Error;

use crate::ledger::LedgerError;

/// Engine custom errors.
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Illegal status transition: {0}")]
    WrongStatus(String),
    #[error("Real estate is encumbered: {0}")]
    Encumbered(String),
    #[error("Operation not permitted: {0}")]
    Forbidden(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
