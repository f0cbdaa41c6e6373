//! Core infrastructure for honeybadger-reporter.
//!
//! This crate provides the pieces shared by the reporter and anything that
//! plugs into it:
//! - Event system for observing delivery attempts
//! - Error taxonomy for configuration and delivery failures

pub mod error;
pub mod events;

pub use error::{ConfigError, DeliveryError};
pub use events::{EventListener, EventListeners, FnListener, ReportingEvent};
