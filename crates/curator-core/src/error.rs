//! Error types for Curator Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CuratorError {
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Invalid credit amount: {0}. Amount must be positive")]
    InvalidAmount(f64),

    #[error("No existing content found for topic: {0}")]
    TopicNotFound(String),

    #[error("Signal source {name} unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type CuratorResult<T> = Result<T, CuratorError>;
