//! The module contains the errors the engine can return.
//!
//! The errors follow the payment-run taxonomy:
//!
//! - [`Validation`] bad or missing input, rejected before any mutation.
//! - [`Calculation`] a receipt or grower could not be priced.
//! - [`Persistence`] a write failed while storing a grower's payments.
//! - [`IntegrityViolation`] a void was refused by the sequence validator.
//! - [`Critical`] an unexpected failure outside the per-grower scope.
//!
//! Calculation and persistence failures are normally accumulated on a
//! [`RunResult`] instead of being returned; integrity and precondition
//! failures are always returned as `Err`.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Calculation`]: EngineError::Calculation
//!  [`Persistence`]: EngineError::Persistence
//!  [`IntegrityViolation`]: EngineError::IntegrityViolation
//!  [`Critical`]: EngineError::Critical
//!  [`RunResult`]: crate::RunResult
use sea_orm::DbErr;
use thiserror::Error;

use crate::VoidValidation;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Calculation failed: {0}")]
    Calculation(String),
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("Void refused: {}", .0.reasons.join("; "))]
    IntegrityViolation(Box<VoidValidation>),
    #[error("Critical failure: {0}")]
    Critical(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Calculation(a), Self::Calculation(b)) => a == b,
            (Self::Persistence(a), Self::Persistence(b)) => a == b,
            (Self::IntegrityViolation(a), Self::IntegrityViolation(b)) => a == b,
            (Self::Critical(a), Self::Critical(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
