use honeybadger_reporter_core::events::ReportingEvent;
use honeybadger_reporter_core::DeliveryError;
use std::time::Instant;

/// Events emitted while reporting a notice.
#[derive(Debug, Clone)]
pub enum ReporterEvent {
    /// A delivery attempt failed and another one is about to be made.
    Retry {
        reporter_name: String,
        timestamp: Instant,
        /// 1-indexed number of the attempt that failed.
        attempt: usize,
        error: DeliveryError,
    },
    /// The notice was accepted by the service.
    Success {
        reporter_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every attempt failed; the notice was dropped.
    Exhausted {
        reporter_name: String,
        timestamp: Instant,
        attempts: usize,
        last_error: DeliveryError,
    },
    /// The error class is excluded by configuration and was not sent.
    Excluded {
        reporter_name: String,
        timestamp: Instant,
        error_class: String,
    },
}

impl ReportingEvent for ReporterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReporterEvent::Retry { .. } => "Retry",
            ReporterEvent::Success { .. } => "Success",
            ReporterEvent::Exhausted { .. } => "Exhausted",
            ReporterEvent::Excluded { .. } => "Excluded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ReporterEvent::Retry { timestamp, .. }
            | ReporterEvent::Success { timestamp, .. }
            | ReporterEvent::Exhausted { timestamp, .. }
            | ReporterEvent::Excluded { timestamp, .. } => *timestamp,
        }
    }

    fn reporter_name(&self) -> &str {
        match self {
            ReporterEvent::Retry { reporter_name, .. }
            | ReporterEvent::Success { reporter_name, .. }
            | ReporterEvent::Exhausted { reporter_name, .. }
            | ReporterEvent::Excluded { reporter_name, .. } => reporter_name,
        }
    }

    fn attempts(&self) -> usize {
        match self {
            ReporterEvent::Retry { attempt, .. } => *attempt,
            ReporterEvent::Success { attempts, .. } | ReporterEvent::Exhausted { attempts, .. } => {
                *attempts
            }
            ReporterEvent::Excluded { .. } => 0,
        }
    }

    fn failure(&self) -> Option<&DeliveryError> {
        match self {
            ReporterEvent::Retry { error, .. } => Some(error),
            ReporterEvent::Exhausted { last_error, .. } => Some(last_error),
            ReporterEvent::Success { .. } | ReporterEvent::Excluded { .. } => None,
        }
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, ReporterEvent::Retry { .. })
    }
}
