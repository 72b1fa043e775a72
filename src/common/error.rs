//! Crate-wide error type
//!
//! Only setup and infrastructure failures live here. Per-node connectivity
//! failures are [`crate::node::NodeError`] and never escape the coordinator;
//! application results (absent file, delete outcome) are plain values.

use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No endpoint is registered under the name
    #[error("Name not bound: {0}")]
    NotBound(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// File name that cannot be mapped below a node's root
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),
}

impl Error {
    /// Transient failures worth another attempt, such as a registry that is
    /// not up yet or a name a node has not bound yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectionFailed(_) | Error::NotBound(_) => true,
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    pub fn to_http_status(&self) -> StatusCode {
        match self {
            Error::NotBound(_) => StatusCode::NOT_FOUND,
            Error::Registry(_) => StatusCode::CONFLICT,
            Error::InvalidName(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::ConnectionFailed(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_) | Error::ConfigLoad(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
