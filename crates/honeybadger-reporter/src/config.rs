use crate::events::ReporterEvent;
use honeybadger_reporter_core::events::{EventListeners, FnListener, ReportingEvent};
use honeybadger_reporter_core::{ConfigError, DeliveryError};
use std::collections::HashSet;
use std::time::Duration;

/// Default number of retries after the first delivery attempt.
pub const DEFAULT_MAX_ERROR_REPORTING_RETRIES: u32 = 3;
/// Default base URL of the reporting service.
pub const DEFAULT_ENDPOINT: &str = "https://api.honeybadger.io";
/// Default connection timeout applied by [`HttpTransport`](crate::HttpTransport).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default whole-request timeout applied by [`HttpTransport`](crate::HttpTransport).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables read by [`ReporterConfigBuilder::from_env`].
pub mod env {
    pub const API_KEY: &str = "HONEYBADGER_API_KEY";
    pub const ENVIRONMENT: &str = "HONEYBADGER_ENV";
    pub const URL: &str = "HONEYBADGER_URL";
    pub const EXCLUDED_EXCEPTIONS: &str = "HONEYBADGER_EXCLUDED_EXCEPTIONS";
    pub const MAX_ERROR_REPORTING_RETRIES: &str = "HONEYBADGER_MAX_ERROR_REPORTING_RETRIES";
}

/// Validated reporter configuration.
///
/// Only obtainable through [`ReporterConfigBuilder::build`], so a value of
/// this type always carries a non-negative retry count and an API key.
#[derive(Clone, Debug)]
pub struct ReporterConfig {
    pub(crate) max_error_reporting_retries: u32,
    pub(crate) api_key: String,
    pub(crate) endpoint: String,
    pub(crate) environment: Option<String>,
    pub(crate) excluded_error_classes: HashSet<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) retry_delay: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<ReporterEvent>,
}

impl ReporterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ReporterConfigBuilder {
        ReporterConfigBuilder::new()
    }

    /// Number of retries made after the first failed attempt.
    ///
    /// A report makes at most `maximum_error_reporting_retries() + 1`
    /// delivery attempts.
    pub fn maximum_error_reporting_retries(&self) -> u32 {
        self.max_error_reporting_retries
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Returns `true` if notices of `error_class` are never sent.
    pub fn is_excluded(&self, error_class: &str) -> bool {
        self.excluded_error_classes.contains(error_class)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Instance name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`ReporterConfig`].
pub struct ReporterConfigBuilder {
    max_error_reporting_retries: i64,
    api_key: Option<String>,
    endpoint: String,
    environment: Option<String>,
    excluded_error_classes: HashSet<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
    retry_delay: Duration,
    name: String,
    event_listeners: EventListeners<ReporterEvent>,
}

impl Default for ReporterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReporterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_error_reporting_retries: 3
    /// - endpoint: `https://api.honeybadger.io`
    /// - retry_delay: zero (attempts follow each other immediately)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_error_reporting_retries: i64::from(DEFAULT_MAX_ERROR_REPORTING_RETRIES),
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            environment: None,
            excluded_error_classes: HashSet::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_delay: Duration::ZERO,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Seeds a builder from the process environment.
    ///
    /// See [`env`] for the variables consulted. Unset variables keep their
    /// defaults; explicit builder calls made afterwards take precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Seeds a builder from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the retry count is not an
    /// integer. A negative integer is accepted here and rejected by
    /// [`build`](Self::build).
    ///
    /// # Example
    ///
    /// ```
    /// use honeybadger_reporter::ReporterConfigBuilder;
    ///
    /// let config = ReporterConfigBuilder::from_lookup(|key| match key {
    ///     "HONEYBADGER_API_KEY" => Some("secret".to_string()),
    ///     "HONEYBADGER_MAX_ERROR_REPORTING_RETRIES" => Some("5".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap()
    /// .build()
    /// .unwrap();
    ///
    /// assert_eq!(config.maximum_error_reporting_retries(), 5);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();

        if let Some(key) = lookup(env::API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(environment) = lookup(env::ENVIRONMENT) {
            builder = builder.environment(environment);
        }
        if let Some(url) = lookup(env::URL) {
            builder = builder.endpoint(url);
        }
        if let Some(classes) = lookup(env::EXCLUDED_EXCEPTIONS) {
            builder = builder.excluded_error_classes(
                classes
                    .split(',')
                    .map(str::trim)
                    .filter(|class| !class.is_empty()),
            );
        }
        if let Some(raw) = lookup(env::MAX_ERROR_REPORTING_RETRIES) {
            let retries = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: env::MAX_ERROR_REPORTING_RETRIES,
                    value: raw.clone(),
                })?;
            builder = builder.max_error_reporting_retries(retries);
        }

        Ok(builder)
    }

    /// Sets the API key sent with every notice.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets how many times a failed delivery is retried.
    ///
    /// This excludes the initial attempt, so a value of 3 means 1 initial
    /// attempt + 3 retries. Negative values are rejected by
    /// [`build`](Self::build).
    ///
    /// Default: 3
    pub fn max_error_reporting_retries(mut self, retries: i64) -> Self {
        self.max_error_reporting_retries = retries;
        self
    }

    /// Sets the base URL of the reporting service.
    ///
    /// Notices are posted to `{endpoint}/v1/notices`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the environment name attached to every notice.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Adds an error class that must never be reported.
    ///
    /// Classes are matched against [`Notice::error_class`](crate::Notice::error_class).
    pub fn exclude_error_class(mut self, error_class: impl Into<String>) -> Self {
        self.excluded_error_classes.insert(error_class.into());
        self
    }

    /// Adds several excluded error classes.
    pub fn excluded_error_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_error_classes
            .extend(classes.into_iter().map(Into::into));
        self
    }

    /// Default: 5 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets a fixed pause between a failed attempt and the next one.
    ///
    /// The pause never changes how many attempts are made.
    ///
    /// Default: zero
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the name of this reporter instance (used in events, logs and metrics).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked after a failed attempt that will be retried.
    ///
    /// # Callback Signature
    /// `Fn(usize, &DeliveryError)` - the 1-indexed attempt that failed and
    /// why it failed.
    ///
    /// # Example
    /// ```rust,no_run
    /// use honeybadger_reporter::ReporterConfig;
    ///
    /// let config = ReporterConfig::builder()
    ///     .api_key("secret")
    ///     .on_retry(|attempt, error| {
    ///         eprintln!("attempt {attempt} failed: {error}");
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &DeliveryError) + Send + Sync + 'static,
    {
        self.event_listeners.on_failed_attempt(f);
        self
    }

    /// Registers a callback invoked when a notice is accepted.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - total attempts made, including the first one.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.on_terminal(move |event| {
            if event.is_delivered() {
                f(event.attempts());
            }
        });
        self
    }

    /// Registers a callback invoked when every attempt has failed.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - total attempts made; always `max_error_reporting_retries + 1`.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.on_terminal(move |event| {
            if event.failure().is_some() {
                f(event.attempts());
            }
        });
        self
    }

    /// Registers a callback invoked when a notice is skipped because its
    /// error class is excluded.
    pub fn on_excluded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ReporterEvent::Excluded { error_class, .. } = event {
                f(error_class);
            }
        }));
        self
    }

    /// Validates the settings and builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidArgument`] if the retry count is negative
    /// - [`ConfigError::MissingApiKey`] if no non-empty API key was set
    pub fn build(self) -> Result<ReporterConfig, ConfigError> {
        let max_error_reporting_retries = u32::try_from(self.max_error_reporting_retries)
            .map_err(|_| ConfigError::InvalidArgument {
                field: "max_error_reporting_retries",
                value: self.max_error_reporting_retries,
            })?;

        let api_key = match self.api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(ConfigError::MissingApiKey),
        };

        Ok(ReporterConfig {
            max_error_reporting_retries,
            api_key,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            environment: self.environment,
            excluded_error_classes: self.excluded_error_classes,
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            retry_delay: self.retry_delay,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
