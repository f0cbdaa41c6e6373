//! Errors returned by [`Reporter`](crate::Reporter).

use honeybadger_reporter_core::DeliveryError;

/// Why a report did not reach the service.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Every delivery attempt failed.
    #[error("notice dropped after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Attempts made, including the first one.
        attempts: usize,
        /// Failure of the final attempt.
        last: DeliveryError,
    },
    /// The notice could not be encoded; nothing was sent.
    #[error("failed to serialize notice: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    /// Returns `true` if delivery was attempted and every attempt failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ReportError::Exhausted { .. })
    }

    /// Attempts made before giving up (zero when nothing was sent).
    pub fn attempts(&self) -> usize {
        match self {
            ReportError::Exhausted { attempts, .. } => *attempts,
            ReportError::Serialization(_) => 0,
        }
    }
}

/// Result type for reporter operations.
pub type Result<T> = std::result::Result<T, ReportError>;
