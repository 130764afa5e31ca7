//! Error types for feed and detail-page access.

use std::fmt;

use thiserror::Error;

/// High-level classification of a feed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedErrorCode {
    /// Network-level failure: connect, timeout, DNS resolution.
    Network,
    /// Upstream answered with a non-success HTTP status.
    Status,
    /// Payload did not have the expected shape: non-array JSON body,
    /// malformed timestamp.
    InvalidResponse,
    /// Detail HTML was missing every recognizable marker.
    Scrape,
}

impl FeedErrorCode {
    /// Returns true if the error is transient and a later cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Status)
    }

    /// Returns a stable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Status => "status",
            Self::InvalidResponse => "invalid_response",
            Self::Scrape => "scrape",
        }
    }
}

impl fmt::Display for FeedErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from the events feed or a detail page.
#[derive(Debug, Error)]
pub struct FeedError {
    code: FeedErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FeedError {
    /// Creates an error with the given code and message.
    pub fn new(code: FeedErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::Network, message)
    }

    /// Creates a non-success-status error.
    pub fn status(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::Status, message)
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::InvalidResponse, message)
    }

    /// Creates a scrape error.
    pub fn scrape(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::Scrape, message)
    }

    /// Classifies a reqwest transport failure.
    pub fn transport(err: reqwest::Error) -> Self {
        let error = if err.is_timeout() {
            Self::network("request timeout")
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else {
            Self::network(format!("request failed: {err}"))
        };
        error.with_source(err)
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FeedErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if a later cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
