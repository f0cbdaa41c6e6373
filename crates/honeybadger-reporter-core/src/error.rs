//! Error taxonomy shared by reporter components.
//!
//! Two families live here:
//!
//! - [`ConfigError`]: raised while building a configuration. Fatal to
//!   construction and never retried.
//! - [`DeliveryError`]: the outcome of a single failed delivery attempt.
//!   Recoverable; the reporter retries it while attempt budget remains.
//!
//! ```
//! use honeybadger_reporter_core::DeliveryError;
//!
//! let err = DeliveryError::Server { status: 503 };
//! assert!(err.is_server());
//! assert_eq!(err.status(), Some(503));
//! assert_eq!(err.to_string(), "server responded with status 503");
//! ```

/// Errors that can occur while building a reporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric setting was outside its permitted range.
    #[error("invalid argument for {field}: {value} (must be >= 0)")]
    InvalidArgument {
        /// Name of the offending setting.
        field: &'static str,
        /// The value that was rejected.
        value: i64,
    },
    /// No API key was supplied.
    #[error("an API key is required to report errors")]
    MissingApiKey,
    /// A setting read from the environment could not be parsed.
    #[error("could not parse {key}={value:?}")]
    InvalidValue {
        /// The variable that held the value.
        key: &'static str,
        /// The raw value.
        value: String,
    },
}

/// A single failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The request never produced a response (I/O or network fault).
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("server responded with status {status}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
    },
}

impl DeliveryError {
    /// Returns `true` for I/O and network faults.
    pub fn is_transport(&self) -> bool {
        matches!(self, DeliveryError::Transport(_))
    }

    /// Returns `true` for non-success responses.
    pub fn is_server(&self) -> bool {
        matches!(self, DeliveryError::Server { .. })
    }

    /// The response status, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Server { status } => Some(*status),
            DeliveryError::Transport(_) => None,
        }
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(err: std::io::Error) -> Self {
        DeliveryError::Transport(err.to_string())
    }
}
