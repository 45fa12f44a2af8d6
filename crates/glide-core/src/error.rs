//! Error types for glide-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Value {value} out of range for {field} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
