//! Notice payload built from a captured error.
//!
//! A [`Notice`] is the per-report unit of work: it is created from an error,
//! optionally enriched with context, serialized once, and dropped when the
//! attempt loop ends.

use crate::config::ReporterConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

const NOTIFIER_NAME: &str = "honeybadger-reporter";
const NOTIFIER_URL: &str = "https://www.honeybadger.io/";

/// A captured error, ready to be serialized for delivery.
///
/// The wire document is produced by [`Notice::to_json`], which adds the
/// notifier and server sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    error: ErrorDetails,
    context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ErrorDetails {
    class: String,
    message: String,
    backtrace: Vec<Frame>,
    causes: Vec<Cause>,
}

/// One backtrace frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Cause {
    message: String,
}

impl Notice {
    /// Captures `error`, its `source()` chain, and the current backtrace.
    ///
    /// The error class is the concrete Rust type name of `E`. The first
    /// backtrace frame is the caller; frames of the reporter and of the
    /// runtime below `main` are left out.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + 'static,
    {
        Self::with_class(std::any::type_name::<E>(), error).backtrace(capture_frames())
    }

    /// Builds a notice for a type-erased error with an explicit class name.
    pub fn with_class(class: impl Into<String>, error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(Cause {
                message: cause.to_string(),
            });
            source = cause.source();
        }

        Self {
            error: ErrorDetails {
                class: class.into(),
                message: error.to_string(),
                backtrace: Vec::new(),
                causes,
            },
            context: BTreeMap::new(),
        }
    }

    /// Replaces the backtrace frames.
    pub fn backtrace(mut self, frames: Vec<Frame>) -> Self {
        self.error.backtrace = frames;
        self
    }

    /// Attaches a context entry sent alongside the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn error_class(&self) -> &str {
        &self.error.class
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }

    /// Messages of the `source()` chain, outermost first.
    pub fn causes(&self) -> impl Iterator<Item = &str> {
        self.error.causes.iter().map(|c| c.message.as_str())
    }

    pub fn frames(&self) -> &[Frame] {
        &self.error.backtrace
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Serializes the notice into the JSON document posted to the service.
    pub fn to_json(&self, config: &ReporterConfig) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Payload {
            notifier: Notifier {
                name: NOTIFIER_NAME,
                url: NOTIFIER_URL,
                version: env!("CARGO_PKG_VERSION"),
            },
            error: &self.error,
            request: RequestSection {
                context: &self.context,
            },
            server: Server {
                environment_name: config.environment(),
                hostname: std::env::var("HOSTNAME").ok(),
                project_root: std::env::current_dir()
                    .ok()
                    .map(|dir| dir.display().to_string()),
            },
        })
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    notifier: Notifier,
    error: &'a ErrorDetails,
    request: RequestSection<'a>,
    server: Server<'a>,
}

#[derive(Serialize)]
struct Notifier {
    name: &'static str,
    url: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct RequestSection<'a> {
    context: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct Server<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    environment_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_root: Option<String>,
}

/// Frame prefixes that belong to the capture machinery or the reporter itself.
/// Skipped only while they sit on top of the stack.
const REPORTER_FRAMES: &[&str] = &[
    "backtrace::",
    "honeybadger_reporter::notice::Notice",
    "honeybadger_reporter::notice::capture_frames",
    "honeybadger_reporter::Reporter",
];

/// Runtime frames: skipped on top of the stack and trimmed off its bottom.
const RUNTIME_FRAMES: &[&str] = &["std::", "core::", "alloc::", "test::", "__rust"];

/// Process and thread entry points below `main`.
const START_SYMBOLS: &[&str] = &[
    "__libc_start_call_main",
    "__libc_start_main_impl",
    "_start",
    "start_thread",
    "clone3",
    "__clone3",
];

const MAX_FRAMES: usize = 50;

fn matches_any(symbol: &str, prefixes: &[&str]) -> bool {
    let symbol = symbol.trim_start_matches('<');
    prefixes.iter().any(|prefix| symbol.starts_with(prefix))
}

/// Walks the current stack and resolves each frame to a symbol and location.
///
/// Frames without both a symbol name and a file name are dropped.
fn capture_frames() -> Vec<Frame> {
    let mut resolved = Vec::new();
    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            let (Some(name), Some(file)) = (symbol.name(), symbol.filename()) else {
                return;
            };
            resolved.push(Frame {
                method: format!("{name:#}"),
                file: Some(file.display().to_string()),
                number: symbol.lineno().map(|line| line.to_string()),
            });
        });
        true
    });
    filter_frames(resolved)
}

/// Drops capture and reporter frames from the top of the stack and runtime
/// frames from its bottom, so the first frame is the code that reported.
fn filter_frames(frames: Vec<Frame>) -> Vec<Frame> {
    let mut frames: Vec<Frame> = frames
        .into_iter()
        .skip_while(|frame| {
            matches_any(&frame.method, REPORTER_FRAMES)
                || matches_any(&frame.method, RUNTIME_FRAMES)
        })
        .collect();

    while let Some(last) = frames.last() {
        if matches_any(&last.method, RUNTIME_FRAMES)
            || START_SYMBOLS.contains(&last.method.as_str())
        {
            frames.pop();
        } else {
            break;
        }
    }

    frames.truncate(MAX_FRAMES);
    frames
}
