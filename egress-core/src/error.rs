//! Error types for the core data model.

use thiserror::Error;

/// Errors from request validation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
