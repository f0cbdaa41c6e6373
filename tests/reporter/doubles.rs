//! Delivery doubles.
//!
//! Each double counts its attempts so tests can assert on exactly how many
//! times the reporter tried to send.

use honeybadger_reporter::{Deliver, DeliveryError, Response};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Every attempt fails with an I/O error.
#[derive(Default)]
pub struct AlwaysFail {
    attempts: AtomicUsize,
}

impl AlwaysFail {
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Deliver for AlwaysFail {
    fn send(&self, _payload: &str) -> Result<Response, DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::other("staged IO exception").into())
    }
}

/// Every attempt gets a response with a fixed non-success status.
pub struct AlwaysServerError {
    status: u16,
    attempts: AtomicUsize,
}

impl AlwaysServerError {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Deliver for AlwaysServerError {
    fn send(&self, _payload: &str) -> Result<Response, DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(self.status, "internal error"))
    }
}

/// Replays a fixed script of results, then keeps accepting.
pub struct Scripted {
    script: Mutex<Vec<Result<Response, DeliveryError>>>,
    payloads: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(mut script: Vec<Result<Response, DeliveryError>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

impl Deliver for Scripted {
    fn send(&self, payload: &str) -> Result<Response, DeliveryError> {
        self.payloads.lock().unwrap().push(payload.to_string());
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(Response::new(201, r#"{"id":"accepted"}"#)))
    }
}

/// The error type reported throughout these tests.
#[derive(Debug)]
pub struct AlwaysFailError;

impl std::fmt::Display for AlwaysFailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Always fail")
    }
}

impl std::error::Error for AlwaysFailError {}
