//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The error enum for everything that can go wrong inside a provider
//! - [`ErrorKind`]: Classification of a failure (transport, payload, decode)
//! - [`ConfigError`]: Invalid engine configuration
//!
//! None of these errors ever reach the caller of the aggregator: providers convert
//! them into an absent quote at their boundary (see
//! [`QuoteProvider::fetch`](crate::provider::QuoteProvider::fetch)).

mod kind;

pub use kind::ErrorKind;

use thiserror::Error;

/// Errors that can occur while fetching a quote from a single provider.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that answered
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider signalled that it has no data for the instrument.
    #[error("No data from {provider} for {code}")]
    NoData {
        /// The provider that returned the sentinel
        provider: String,
        /// The instrument code that was requested
        code: String,
    },

    /// An expected field was missing from the provider response.
    #[error("Missing field '{field}' in {provider} response")]
    MissingField {
        /// The provider whose response was incomplete
        provider: String,
        /// The missing field
        field: String,
    },

    /// The instrument code does not have the shape this provider needs.
    #[error("Unsupported code {code} for {provider}")]
    UnsupportedCode {
        /// The provider that rejected the code
        provider: String,
        /// The rejected code
        code: String,
    },

    /// The response could not be decoded (charset, framing, markup).
    #[error("Decode error: {provider} - {message}")]
    Decode {
        /// The provider whose response failed to decode
        provider: String,
        /// What went wrong
        message: String,
    },

    /// A structured payload was not valid JSON for the expected schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric field could not be parsed as a decimal.
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

impl MarketDataError {
    /// Shorthand for [`MarketDataError::MissingField`].
    pub fn missing(provider: &str, field: &str) -> Self {
        Self::MissingField {
            provider: provider.to_string(),
            field: field.to_string(),
        }
    }

    /// Shorthand for [`MarketDataError::Decode`].
    pub fn decode(provider: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use fundwatch_market_data::errors::{ErrorKind, MarketDataError};
    ///
    /// let error = MarketDataError::Timeout { provider: "SINA".to_string() };
    /// assert_eq!(error.kind(), ErrorKind::Transport);
    ///
    /// let error = MarketDataError::InvalidNumber("--".to_string());
    /// assert_eq!(error.kind(), ErrorKind::Decode);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::HttpStatus { .. } | Self::Timeout { .. } => {
                ErrorKind::Transport
            }

            Self::NoData { .. } | Self::MissingField { .. } | Self::UnsupportedCode { .. } => {
                ErrorKind::Payload
            }

            Self::Decode { .. } | Self::Json(_) | Self::InvalidNumber(_) => ErrorKind::Decode,
        }
    }
}

/// Errors raised while building an [`EngineConfig`](crate::config::EngineConfig)
/// or the [`QuoteAggregator`](crate::QuoteAggregator) on top of it.
///
/// These are the only errors a caller of this crate ever sees, and only at
/// construction time.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The shared HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A provider id that does not name any known provider.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A setting that could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// The setting name
        key: String,
        /// The rejected raw value
        value: String,
    },
}
