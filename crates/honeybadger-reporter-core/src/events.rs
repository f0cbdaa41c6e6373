//! Events emitted while a notice moves through its delivery attempts.
//!
//! Every report produces zero or more failed-attempt events followed by
//! exactly one terminal event. Listeners registered on a configuration see
//! them in that order, on the reporting thread.

use crate::error::DeliveryError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event in the life of one report.
pub trait ReportingEvent: Send + Sync + fmt::Debug {
    /// Returns the kind of event (e.g. "Retry", "Exhausted").
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// Returns the name of the reporter instance that emitted this event.
    fn reporter_name(&self) -> &str;

    /// Attempts made for the notice when the event fired. Zero when nothing
    /// was sent.
    fn attempts(&self) -> usize;

    /// The delivery failure the event carries, if any.
    fn failure(&self) -> Option<&DeliveryError>;

    /// Whether the report is finished. Emitted exactly once per report.
    fn is_terminal(&self) -> bool;

    /// The notice reached the service.
    fn is_delivered(&self) -> bool {
        self.is_terminal() && self.failure().is_none() && self.attempts() > 0
    }
}

/// Trait for listening to reporting events.
pub trait EventListener<E: ReportingEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Type alias for shared event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners.
///
/// Cloning the collection shares the listeners; it does not duplicate them.
#[derive(Clone)]
pub struct EventListeners<E: ReportingEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ReportingEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Calls `f` with the attempt number and failure of every attempt that
    /// failed and will be retried.
    pub fn on_failed_attempt<F>(&mut self, f: F)
    where
        E: 'static,
        F: Fn(usize, &DeliveryError) + Send + Sync + 'static,
    {
        self.add(FnListener::new(move |event: &E| {
            if event.is_terminal() {
                return;
            }
            if let Some(failure) = event.failure() {
                f(event.attempts(), failure);
            }
        }));
    }

    /// Calls `f` once per report, with the event that finished it.
    pub fn on_terminal<F>(&mut self, f: F)
    where
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add(FnListener::new(move |event: &E| {
            if event.is_terminal() {
                f(event);
            }
        }));
    }

    /// Delivers `event` to every listener in registration order.
    ///
    /// A panicking listener is isolated: the panic is caught and the
    /// remaining listeners still run.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ReportingEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ReportingEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A closure-backed event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ReportingEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
