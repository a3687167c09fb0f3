//! Error types for the curator MCP server

use curator_core::CuratorError;
use thiserror::Error;

/// Unified error type for the MCP server
#[derive(Error, Debug)]
pub enum CuratorMcpError {
    #[error(transparent)]
    Core(#[from] CuratorError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Trend snapshot unavailable: {0}")]
    Trends(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CuratorMcpError>;

impl From<reqwest::Error> for CuratorMcpError {
    fn from(e: reqwest::Error) -> Self {
        CuratorMcpError::Http(e.to_string())
    }
}

impl From<config::ConfigError> for CuratorMcpError {
    fn from(e: config::ConfigError) -> Self {
        CuratorMcpError::Config(e.to_string())
    }
}

/// Validate a curator account name
pub fn validate_account_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CuratorMcpError::InvalidParameter(
            "Account name cannot be empty".into(),
        ));
    }
    if name.len() > 128 {
        return Err(CuratorMcpError::InvalidParameter("Account name too long".into()));
    }
    Ok(())
}

/// Validate a topic string
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(CuratorMcpError::InvalidParameter("Topic cannot be empty".into()));
    }
    if topic.len() > 512 {
        return Err(CuratorMcpError::InvalidParameter("Topic too long".into()));
    }
    Ok(())
}

/// Validate a result limit
pub fn validate_limit(limit: u64) -> Result<usize> {
    if limit == 0 || limit > 100 {
        return Err(CuratorMcpError::InvalidParameter(format!(
            "Invalid limit {}. Must be between 1 and 100",
            limit
        )));
    }
    Ok(limit as usize)
}
