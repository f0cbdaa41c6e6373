//! Blocking error reporter for Honeybadger-compatible services.
//!
//! A [`Reporter`] turns an error into a [`Notice`], serializes it once, and
//! hands it to a [`Deliver`] implementation. Failed attempts (transport
//! faults or non-2xx responses) are retried up to the configured number of
//! times, so a report makes at most `max_error_reporting_retries + 1`
//! attempts.
//!
//! # Features
//!
//! - **Bounded retries**: one knob, validated when the configuration is built
//! - **Injectable delivery**: [`HttpTransport`] in production, any closure in tests
//! - **Event system**: observe retries, successes and exhaustion
//! - **Exclusions**: skip error classes that should never be reported
//! - `tracing` (default) and `metrics` cargo features
//!
//! # Examples
//!
//! ```
//! use honeybadger_reporter::{DeliveryError, Reporter, ReporterConfig, Response};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let config = ReporterConfig::builder()
//!     .api_key("secret")
//!     .max_error_reporting_retries(2)
//!     .on_retry(|attempt, error| println!("attempt {attempt} failed: {error}"))
//!     .build()?;
//!
//! let calls = AtomicUsize::new(0);
//! let reporter = Reporter::with_transport(config, move |_payload: &str| {
//!     calls.fetch_add(1, Ordering::SeqCst);
//!     Err::<Response, _>(DeliveryError::Transport("connection refused".into()))
//! });
//!
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
//! let result = reporter.report_error(&err);
//! assert_eq!(result.unwrap_err().attempts(), 3);
//! # Ok::<(), honeybadger_reporter::ConfigError>(())
//! ```

mod config;
mod error;
mod events;
mod notice;
mod transport;

pub use config::{
    env, ReporterConfig, ReporterConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_MAX_ERROR_REPORTING_RETRIES, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{ReportError, Result};
pub use events::ReporterEvent;
pub use honeybadger_reporter_core::{ConfigError, DeliveryError};
pub use notice::{Frame, Notice};
pub use transport::{AttemptOutcome, Deliver, HttpTransport, Response, NOTICES_PATH};

#[cfg(any(feature = "metrics", feature = "tracing"))]
use honeybadger_reporter_core::events::ReportingEvent;
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, error, warn};

/// What happened to a report that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The service accepted the notice.
    Delivered {
        /// Attempts made, including the first one.
        attempts: usize,
        /// Id assigned by the service, when the response carried one.
        notice_id: Option<String>,
    },
    /// The error class is excluded by configuration; nothing was sent.
    Excluded,
}

impl ReportOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ReportOutcome::Delivered { .. })
    }
}

/// Reports errors, retrying failed deliveries.
///
/// The configuration is shared read-only, so one reporter can serve any
/// number of threads. Each call blocks until the notice is delivered or the
/// attempt budget is spent.
pub struct Reporter<D = HttpTransport> {
    transport: D,
    config: Arc<ReporterConfig>,
}

impl Reporter<HttpTransport> {
    /// Creates a reporter that posts notices over HTTP.
    pub fn new(config: impl Into<Arc<ReporterConfig>>) -> Self {
        let config = config.into();
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, transport)
    }
}

impl<D: Deliver> Reporter<D> {
    /// Creates a reporter that delivers through `transport`.
    pub fn with_transport(config: impl Into<Arc<ReporterConfig>>, transport: D) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "reporter_attempts_total",
                "Total number of delivery attempts (success, transport_failure, server_failure)"
            );
            describe_counter!(
                "reporter_reports_total",
                "Total number of reports (delivered, exhausted, excluded)"
            );
            describe_histogram!(
                "reporter_attempts",
                "Number of attempts per report that reached a terminal state"
            );
        }

        Self {
            transport,
            config: config.into(),
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn transport(&self) -> &D {
        &self.transport
    }

    /// Reports `error` to the service.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Exhausted`] once all `max_error_reporting_retries + 1`
    ///   attempts have failed. The failure is also logged, so callers that
    ///   only want fire-and-forget reporting may ignore it.
    /// - [`ReportError::Serialization`] if the notice could not be encoded.
    pub fn report_error<E>(&self, error: &E) -> Result<ReportOutcome>
    where
        E: Error + 'static,
    {
        self.report_notice(&Notice::from_error(error))
    }

    /// Reports a prepared notice, e.g. one carrying extra context.
    pub fn report_notice(&self, notice: &Notice) -> Result<ReportOutcome> {
        if self.config.is_excluded(notice.error_class()) {
            self.excluded(notice);
            return Ok(ReportOutcome::Excluded);
        }

        let payload = notice.to_json(&self.config)?;
        self.deliver(&payload)
    }

    fn excluded(&self, notice: &Notice) {
        self.record(&ReporterEvent::Excluded {
            reporter_name: self.config.name.clone(),
            timestamp: Instant::now(),
            error_class: notice.error_class().to_string(),
        });
    }

    /// Hands `event` to the listeners, then logs it and, for terminal
    /// events, counts the report.
    fn record(&self, event: &ReporterEvent) {
        self.config.event_listeners.emit(event);

        #[cfg(feature = "metrics")]
        count_report(event);

        #[cfg(feature = "tracing")]
        log_event(event);
    }

    /// Runs the attempt loop: one initial attempt plus up to
    /// `max_error_reporting_retries` retries, stopping at the first success.
    fn deliver(&self, payload: &str) -> Result<ReportOutcome> {
        let config = &self.config;
        let max_attempts = usize::try_from(config.max_error_reporting_retries)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = AttemptOutcome::classify(self.transport.send(payload));

            #[cfg(feature = "metrics")]
            {
                let result = match &outcome {
                    AttemptOutcome::Success(_) => "success",
                    AttemptOutcome::TransportFailure(_) => "transport_failure",
                    AttemptOutcome::ServerFailure(_) => "server_failure",
                };
                counter!("reporter_attempts_total", "reporter" => config.name.clone(), "result" => result).increment(1);
            }

            let failure = match outcome.into_result() {
                Ok(response) => {
                    self.record(&ReporterEvent::Success {
                        reporter_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(ReportOutcome::Delivered {
                        attempts: attempt,
                        notice_id: response.notice_id(),
                    });
                }
                Err(failure) => failure,
            };

            if attempt >= max_attempts {
                self.record(&ReporterEvent::Exhausted {
                    reporter_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt,
                    last_error: failure.clone(),
                });
                return Err(ReportError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            self.record(&ReporterEvent::Retry {
                reporter_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                error: failure,
            });

            if !config.retry_delay.is_zero() {
                std::thread::sleep(config.retry_delay);
            }
        }
    }
}

#[cfg(feature = "metrics")]
fn count_report(event: &ReporterEvent) {
    if !event.is_terminal() {
        return;
    }
    let reporter = event.reporter_name().to_string();
    let result = match event {
        ReporterEvent::Excluded { .. } => "excluded",
        _ if event.is_delivered() => "delivered",
        _ => "exhausted",
    };
    counter!("reporter_reports_total", "reporter" => reporter.clone(), "result" => result)
        .increment(1);
    if event.attempts() > 0 {
        histogram!("reporter_attempts", "reporter" => reporter).record(event.attempts() as f64);
    }
}

#[cfg(feature = "tracing")]
fn log_event(event: &ReporterEvent) {
    match (event.failure(), event) {
        (Some(failure), _) if event.is_terminal() => error!(
            reporter = event.reporter_name(),
            attempts = event.attempts(),
            error = %failure,
            "Giving up on notice after exhausting retries"
        ),
        (Some(failure), _) => warn!(
            reporter = event.reporter_name(),
            attempt = event.attempts(),
            error = %failure,
            "Notice delivery failed, retrying"
        ),
        (None, ReporterEvent::Excluded { error_class, .. }) => debug!(
            reporter = event.reporter_name(),
            error_class = %error_class,
            "Error class is excluded, notice not sent"
        ),
        (None, _) => debug!(
            reporter = event.reporter_name(),
            attempts = event.attempts(),
            "Notice delivered"
        ),
    }
}

impl<D> Clone for Reporter<D>
where
    D: Clone,
{
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
