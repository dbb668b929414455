//! Error types and handling for the price bridge
//!
//! Every failure mode of the client, the aggregator and the surrounding
//! service is expressed as a [`NomosError`] variant so that callers can tell a
//! fatal misconfiguration apart from a refresh that may succeed on the next tick.

use thiserror::Error;

/// Result type alias for price bridge operations
pub type Result<T> = std::result::Result<T, NomosError>;

/// Main error type for the price bridge
#[derive(Debug, Error)]
pub enum NomosError {
    /// Missing or unusable configuration (fatal, never retried)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Token request failed or returned no token
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Subscription lookup failed
    #[error("Subscription error: {message}")]
    Subscription { message: String },

    /// Price series request failed
    #[error("Price fetch error: {message}")]
    PriceFetch { message: String },

    /// A single price item carried an unusable timestamp
    #[error("Timestamp parse error: {value} - {message}")]
    TimestampParse { value: String, message: String },

    /// A refresh cycle aborted; wraps the underlying cause
    #[error("Refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: Box<NomosError>,
    },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl NomosError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new subscription error
    pub fn subscription<S: Into<String>>(message: S) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Create a new price fetch error
    pub fn price_fetch<S: Into<String>>(message: S) -> Self {
        Self::PriceFetch {
            message: message.into(),
        }
    }

    /// Create a new timestamp parse error
    pub fn timestamp_parse<S: Into<String>>(value: S, message: S) -> Self {
        Self::TimestampParse {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Wrap an error as a failed refresh
    pub fn refresh_failed(source: NomosError) -> Self {
        Self::RefreshFailed {
            source: Box::new(source),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        Self::Web {
            message: message.into(),
        }
    }

    /// Whether retrying on the next scheduled refresh can help
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Authentication { .. } | Self::Subscription { .. } | Self::PriceFetch { .. } => {
                true
            }
            Self::RefreshFailed { source } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for NomosError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for NomosError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for NomosError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
