//! Synchronous, in-process event bus. `emit` records history then
//! invokes every listener in registration order; a panicking listener
//! is isolated via `catch_unwind` so it cannot break delivery to the
//! rest or corrupt history (spec §4.9).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::dom::Scope;
use crate::matcher::MatchKind;

pub type RequestId = String;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    ListeningChanged {
        ts: i64,
        enabled: bool,
    },
    KeywordDetected {
        ts: i64,
        keyword: String,
        confidence: Option<f32>,
    },
    CaptureStarted {
        ts: i64,
        request_id: RequestId,
    },
    CaptureEnded {
        ts: i64,
        request_id: RequestId,
        reason: CaptureEndReason,
    },
    TranscriptionStarted {
        ts: i64,
        request_id: RequestId,
    },
    TranscriptReady {
        ts: i64,
        request_id: RequestId,
        transcript: String,
    },
    TargetIndexBuilt {
        ts: i64,
        request_id: RequestId,
        target_count: usize,
        scope: Scope,
    },
    TargetResolved {
        ts: i64,
        request_id: RequestId,
        target_id: String,
        label: String,
        #[serde(rename = "match")]
        match_kind: MatchKind,
    },
    TargetResolutionFailed {
        ts: i64,
        request_id: RequestId,
        reason: ResolutionFailureReason,
        details: Option<String>,
    },
    ActionProposed {
        ts: i64,
        request_id: RequestId,
        action: String,
        target_id: String,
        risk: Option<String>,
    },
    ConfirmationRequired {
        ts: i64,
        request_id: RequestId,
        action: String,
        target_id: String,
        label: String,
    },
    ActionExecuted {
        ts: i64,
        request_id: RequestId,
        action: String,
        target_id: String,
        ok: bool,
        error: Option<String>,
    },
    EngineError {
        ts: i64,
        request_id: Option<RequestId>,
        code: String,
        message: String,
        details: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureEndReason {
    Vad,
    Timeout,
    Stop,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionFailureReason {
    NoMatch,
    Ambiguous,
    Misconfiguration,
}

type Listener = Box<dyn Fn(&Event) + Send>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

pub struct Unsubscribe {
    id: u64,
}

pub struct EventBus {
    listeners: Vec<(u64, Listener)>,
    history: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Register a listener; returns a token that removes it when passed
    /// to [`EventBus::unsubscribe`].
    pub fn on<F>(&mut self, listener: F) -> Unsubscribe
    where
        F: Fn(&Event) + Send + 'static,
    {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        self.listeners.push((id, Box::new(listener)));
        Unsubscribe { id }
    }

    pub fn unsubscribe(&mut self, token: Unsubscribe) {
        self.listeners.retain(|(id, _)| *id != token.id);
    }

    /// Record the event then invoke every listener in registration
    /// order. A listener that panics is caught and logged; it never
    /// stops delivery to subsequent listeners and never corrupts
    /// history, which is appended before any listener runs.
    pub fn emit(&mut self, event: Event) {
        self.history.push(event.clone());
        for (id, listener) in &self.listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if result.is_err() {
                log::error!("event listener {id} panicked while handling {event:?}");
            }
        }
    }

    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// Remove all listeners and empty history.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.history.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn emit_records_history_in_order() {
        let mut bus = EventBus::new();
        bus.emit(Event::ListeningChanged { ts: 1, enabled: true });
        bus.emit(Event::ListeningChanged { ts: 2, enabled: false });
        assert_eq!(bus.history().len(), 2);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let o1 = order.clone();
        bus.on(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        bus.on(move |_| o2.lock().unwrap().push(2));
        bus.emit(Event::ListeningChanged { ts: 1, enabled: true });
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn panicking_listener_does_not_block_others_or_corrupt_history() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.on(|_| panic!("boom"));
        let c = calls.clone();
        bus.on(move |_| {
            c.fetch_add(1, AtomicOrdering::SeqCst);
        });
        bus.emit(Event::ListeningChanged { ts: 1, enabled: true });
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(bus.history().len(), 1);
    }

    #[test]
    fn clear_removes_listeners_and_history() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        bus.on(move |_| {
            c.fetch_add(1, AtomicOrdering::SeqCst);
        });
        bus.emit(Event::ListeningChanged { ts: 1, enabled: true });
        bus.clear();
        bus.emit(Event::ListeningChanged { ts: 2, enabled: true });
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(bus.history().len(), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let token = bus.on(move |_| {
            c.fetch_add(1, AtomicOrdering::SeqCst);
        });
        bus.unsubscribe(token);
        bus.emit(Event::ListeningChanged { ts: 1, enabled: true });
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }
}
