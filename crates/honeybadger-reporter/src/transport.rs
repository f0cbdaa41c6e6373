//! Delivery capability and the blocking HTTP transport.
//!
//! The reporter never talks to the network directly; it hands the serialized
//! notice to a [`Deliver`] implementation. [`HttpTransport`] is the production
//! implementation, and any `Fn(&str) -> Result<Response, DeliveryError>`
//! closure works as a stand-in.

use crate::config::ReporterConfig;
use honeybadger_reporter_core::DeliveryError;
use ureq::{Agent, AgentBuilder};

/// Path of the notice intake endpoint, relative to the configured base URL.
pub const NOTICES_PATH: &str = "/v1/notices";

/// Response to a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Id the service assigned to the notice, if the body carries one.
    pub fn notice_id(&self) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct Accepted {
            id: String,
        }

        serde_json::from_str::<Accepted>(&self.body)
            .ok()
            .map(|accepted| accepted.id)
    }
}

/// Performs one delivery attempt of a serialized notice.
pub trait Deliver: Send + Sync {
    /// Sends `payload` once.
    ///
    /// Returns `Ok` whenever the service answered, whatever the status;
    /// `Err` only when no response was obtained.
    fn send(&self, payload: &str) -> Result<Response, DeliveryError>;
}

impl<F> Deliver for F
where
    F: Fn(&str) -> Result<Response, DeliveryError> + Send + Sync,
{
    fn send(&self, payload: &str) -> Result<Response, DeliveryError> {
        self(payload)
    }
}

/// Outcome of a single attempt, as seen by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(Response),
    TransportFailure(String),
    ServerFailure(u16),
}

impl AttemptOutcome {
    /// Classifies what a [`Deliver::send`] call produced.
    ///
    /// # Classification rules
    ///
    /// * `Ok` with **2xx** → [`AttemptOutcome::Success`]
    /// * `Ok` with any other status → [`AttemptOutcome::ServerFailure`]
    /// * `Err(Transport)` → [`AttemptOutcome::TransportFailure`]
    /// * `Err(Server)` → [`AttemptOutcome::ServerFailure`]
    pub fn classify(result: Result<Response, DeliveryError>) -> Self {
        match result {
            Ok(response) if response.is_success() => AttemptOutcome::Success(response),
            Ok(response) => AttemptOutcome::ServerFailure(response.status),
            Err(DeliveryError::Transport(reason)) => AttemptOutcome::TransportFailure(reason),
            Err(DeliveryError::Server { status }) => AttemptOutcome::ServerFailure(status),
        }
    }

    /// The failure as a [`DeliveryError`], or the response on success.
    pub fn into_result(self) -> Result<Response, DeliveryError> {
        match self {
            AttemptOutcome::Success(response) => Ok(response),
            AttemptOutcome::TransportFailure(reason) => Err(DeliveryError::Transport(reason)),
            AttemptOutcome::ServerFailure(status) => Err(DeliveryError::Server { status }),
        }
    }
}

/// Blocking HTTP transport posting notices as JSON.
///
/// The agent pools connections, so one transport should be reused for every
/// report made by a [`Reporter`](crate::Reporter).
pub struct HttpTransport {
    agent: Agent,
    url: String,
    api_key: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &ReporterConfig) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout())
            .timeout(config.request_timeout())
            .build();
        Self {
            agent,
            url: format!("{}{}", config.endpoint(), NOTICES_PATH),
            api_key: config.api_key().to_string(),
            user_agent: format!("honeybadger-reporter/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Full URL notices are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Deliver for HttpTransport {
    fn send(&self, payload: &str) -> Result<Response, DeliveryError> {
        let result = self
            .agent
            .post(&self.url)
            .set("X-API-Key", &self.api_key)
            .set("Accept", "application/json")
            .set("Content-Type", "application/json")
            .set("User-Agent", &self.user_agent)
            .send_string(payload);

        match result {
            Ok(response) => read_response(response),
            Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(transport)) => {
                Err(DeliveryError::Transport(transport.to_string()))
            }
        }
    }
}

/// The status line decides the attempt. A body that cannot be read is
/// dropped rather than failing an attempt the service already answered.
fn read_response(response: ureq::Response) -> Result<Response, DeliveryError> {
    let status = response.status();
    let body = match response.into_string() {
        Ok(body) => body,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(status, error = %_err, "Could not read response body");
            String::new()
        }
    };
    Ok(Response { status, body })
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
