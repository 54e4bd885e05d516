//! Engine state machine: the orchestrator wiring KWS, VAD, ASR, the DOM
//! indexer, the matcher and the action executor into the transition
//! table of spec §4.8. Single-threaded cooperative, per §5: every
//! public method runs to completion on the caller's thread; the only
//! "suspension points" (capture timeout, highlight delay) are modeled
//! as explicit deadlines advanced by [`Engine::advance_time`] rather
//! than background timers, mirroring the teacher's preference for
//! explicit, testable control flow over hidden async state.

pub mod request;

use crate::action::{self, ActionExecutorBackend};
use crate::asr::AsrEngine;
use crate::audio::PcmFrame;
use crate::config::{CollisionPolicy, EngineConfig};
use crate::dom::{self, DomAdapter, Risk, TargetIndex};
use crate::error::VoiceRouterError;
use crate::events::{CaptureEndReason, Event, EventBus, ResolutionFailureReason, Unsubscribe};
use crate::kws::KwsPipeline;
use crate::matcher::{self, ResolveOutcome};
use crate::normalize::normalize;
use crate::vad::{VadEngine, VadEvent};

use request::{new_request_id, action_kind_str, AmbiguousHold, PendingAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    ListeningOff,
    ListeningOn,
    CapturingTarget,
    Transcribing,
    ResolvingTarget,
    AwaitingConfirmation,
    Executing,
    /// Ambiguous-match hold: the only persistent flavor of the spec's
    /// `ERROR` state. Every other error path resolves back to
    /// `ListeningOn` within the same call.
    Error,
}

pub struct Engine {
    config: EngineConfig,
    kws: KwsPipeline,
    vad: VadEngine,
    asr: Box<dyn AsrEngine>,
    dom_adapter: Box<dyn DomAdapter>,
    action_backend: Box<dyn ActionExecutorBackend>,
    bus: EventBus,

    state: EngineState,
    current_request_id: Option<String>,
    current_index: Option<TargetIndex>,
    capture_buffer: Vec<PcmFrame>,
    capture_deadline_ms: Option<i64>,
    highlight: Option<(i64, PendingAction)>,
    confirmation_pending: Option<PendingAction>,
    ambiguous_hold: Option<AmbiguousHold>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        kws: KwsPipeline,
        vad: VadEngine,
        asr: Box<dyn AsrEngine>,
        dom_adapter: Box<dyn DomAdapter>,
        action_backend: Box<dyn ActionExecutorBackend>,
    ) -> Self {
        Self {
            config,
            kws,
            vad,
            asr,
            dom_adapter,
            action_backend,
            bus: EventBus::new(),
            state: EngineState::ListeningOff,
            current_request_id: None,
            current_index: None,
            capture_buffer: Vec::new(),
            capture_deadline_ms: None,
            highlight: None,
            confirmation_pending: None,
            ambiguous_hold: None,
        }
    }

    /// All models are constructed and loaded before the engine is built;
    /// `init` exists for API parity with the spec's external interface
    /// and validates nothing further.
    pub fn init(&self) -> crate::error::Result<()> {
        Ok(())
    }

    pub fn start_listening(&mut self, now_ms: i64) {
        if self.state != EngineState::ListeningOff {
            return;
        }
        self.state = EngineState::ListeningOn;
        self.emit(Event::ListeningChanged { ts: now_ms, enabled: true });
    }

    pub fn stop_listening(&mut self, now_ms: i64) {
        if self.state == EngineState::ListeningOff {
            return;
        }
        self.cancel(now_ms);
        self.kws.stop();
        self.vad.stop();
        self.state = EngineState::ListeningOff;
        self.emit(Event::ListeningChanged { ts: now_ms, enabled: false });
    }

    /// Abort only an in-flight request; listening state is unaffected.
    pub fn cancel(&mut self, now_ms: i64) {
        match self.state {
            EngineState::CapturingTarget => self.abort_capture(CaptureEndReason::Cancel, now_ms),
            EngineState::AwaitingConfirmation => {
                self.confirmation_pending = None;
                self.return_to_listening();
            }
            EngineState::Error if self.ambiguous_hold.is_some() => {
                self.ambiguous_hold = None;
                self.return_to_listening();
            }
            EngineState::Executing => {
                self.highlight = None;
                self.return_to_listening();
            }
            _ => {}
        }
    }

    /// Feed one 80ms PCM frame. Drives KWS whenever listening is active,
    /// and additionally the VAD and capture buffer while a capture is in
    /// progress.
    pub fn push_audio_frame(&mut self, frame: &PcmFrame, now_ms: i64) {
        if self.state == EngineState::ListeningOff {
            return;
        }

        if self.state == EngineState::CapturingTarget {
            self.capture_buffer.push(frame.clone());
            let vad_events = self.vad.process_frame(frame, now_ms);
            if vad_events.contains(&VadEvent::SpeechEnd) {
                self.finish_capture(CaptureEndReason::Vad, now_ms);
            }
        }

        let detections = self.kws.process_frame(frame, now_ms);
        for detection in detections {
            self.handle_keyword(&detection.keyword, Some(detection.score), now_ms);
        }
    }

    fn handle_keyword(&mut self, keyword: &str, confidence: Option<f32>, now_ms: i64) {
        self.emit(Event::KeywordDetected {
            ts: now_ms,
            keyword: keyword.to_string(),
            confidence,
        });

        match self.state {
            EngineState::ListeningOn => {
                if keyword == "open" || keyword == "click" {
                    self.start_capture(now_ms);
                }
                // "help" is emit-only (already emitted above); "stop"/"cancel" is a no-op.
            }
            EngineState::CapturingTarget => {
                if keyword == "stop" || keyword == "cancel" {
                    self.abort_capture(CaptureEndReason::Stop, now_ms);
                }
            }
            EngineState::AwaitingConfirmation => {
                if keyword == "stop" || keyword == "cancel" {
                    self.confirmation_pending = None;
                    self.return_to_listening();
                }
            }
            EngineState::Error if self.ambiguous_hold.is_some() => {
                if keyword == "stop" || keyword == "cancel" {
                    self.ambiguous_hold = None;
                    self.return_to_listening();
                }
            }
            _ => {}
        }
    }

    fn start_capture(&mut self, now_ms: i64) {
        let request_id = new_request_id();
        self.current_request_id = Some(request_id.clone());

        let global_deny_active = !self.config.global_deny_selectors.is_empty();
        let (index, _scope_root) = dom::build_index(self.dom_adapter.as_mut(), global_deny_active);
        self.emit(Event::TargetIndexBuilt {
            ts: now_ms,
            request_id: request_id.clone(),
            target_count: index.targets.len(),
            scope: index.scope,
        });
        self.current_index = Some(index);

        self.capture_buffer.clear();
        self.vad.stop();
        self.capture_deadline_ms = Some(now_ms + self.config.capture_timeout_ms as i64);
        self.state = EngineState::CapturingTarget;
        self.emit(Event::CaptureStarted { ts: now_ms, request_id });
    }

    fn abort_capture(&mut self, reason: CaptureEndReason, now_ms: i64) {
        let request_id = match self.current_request_id.clone() {
            Some(id) => id,
            None => return,
        };
        self.capture_buffer.clear();
        self.vad.stop();
        self.capture_deadline_ms = None;
        self.emit(Event::CaptureEnded { ts: now_ms, request_id, reason });
        self.return_to_listening();
    }

    fn finish_capture(&mut self, reason: CaptureEndReason, now_ms: i64) {
        let request_id = match self.current_request_id.clone() {
            Some(id) => id,
            None => return,
        };
        self.vad.stop();
        self.capture_deadline_ms = None;
        let samples: Vec<f32> = self
            .capture_buffer
            .drain(..)
            .flat_map(|f| f.as_slice().to_vec())
            .collect();
        self.emit(Event::CaptureEnded {
            ts: now_ms,
            request_id: request_id.clone(),
            reason,
        });

        self.state = EngineState::Transcribing;
        self.emit(Event::TranscriptionStarted {
            ts: now_ms,
            request_id: request_id.clone(),
        });

        match self.asr.transcribe(&samples) {
            Ok(transcript) if transcript.is_empty() => {
                self.emit_engine_error(Some(request_id), VoiceRouterError::NoSpeechDetected, now_ms);
                self.return_to_listening();
            }
            Ok(transcript) => {
                self.emit(Event::TranscriptReady {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    transcript: transcript.clone(),
                });
                self.state = EngineState::ResolvingTarget;
                self.resolve_target(request_id, &transcript, now_ms);
            }
            Err(e) => {
                self.emit_engine_error(Some(request_id), e, now_ms);
                self.return_to_listening();
            }
        }
    }

    /// Bypasses the audio stages entirely: mints a request, builds the
    /// index, emits `TranscriptReady` synchronously, and resolves.
    pub fn simulate_transcript(&mut self, text: &str, now_ms: i64) {
        if self.state != EngineState::ListeningOn {
            return;
        }
        let request_id = new_request_id();
        self.current_request_id = Some(request_id.clone());

        let global_deny_active = !self.config.global_deny_selectors.is_empty();
        let (index, _scope_root) = dom::build_index(self.dom_adapter.as_mut(), global_deny_active);
        self.emit(Event::TargetIndexBuilt {
            ts: now_ms,
            request_id: request_id.clone(),
            target_count: index.targets.len(),
            scope: index.scope,
        });
        self.current_index = Some(index);

        self.emit(Event::TranscriptReady {
            ts: now_ms,
            request_id: request_id.clone(),
            transcript: text.to_string(),
        });
        self.state = EngineState::ResolvingTarget;
        self.resolve_target(request_id, text, now_ms);
    }

    fn resolve_target(&mut self, request_id: String, transcript: &str, now_ms: i64) {
        let index = match self.current_index.clone() {
            Some(index) => index,
            None => return,
        };

        if index.targets.is_empty() {
            self.emit(Event::TargetResolutionFailed {
                ts: now_ms,
                request_id: request_id.clone(),
                reason: ResolutionFailureReason::Misconfiguration,
                details: Some("no addressable targets in scope".to_string()),
            });
            self.emit_engine_error(Some(request_id), VoiceRouterError::MisconfigNoAddressableTargets, now_ms);
            self.return_to_listening();
            return;
        }

        let normalized_transcript = normalize(transcript);
        let collision_is_error = self.config.collision_policy == CollisionPolicy::Error;
        let outcome = matcher::resolve(
            &normalized_transcript,
            &index,
            self.config.fuzzy_threshold,
            self.config.fuzzy_margin,
            collision_is_error,
        );

        match outcome {
            ResolveOutcome::Unique { target, match_kind } => {
                self.emit(Event::TargetResolved {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    target_id: target.id.clone(),
                    label: target.raw_label.clone(),
                    match_kind,
                });
                let action = target.default_action;
                let risk_high = target.risk == Some(Risk::High);
                self.emit(Event::ActionProposed {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    action: action_kind_str(action).to_string(),
                    target_id: target.id.clone(),
                    risk: risk_high.then(|| "high".to_string()),
                });

                if risk_high {
                    self.emit(Event::ConfirmationRequired {
                        ts: now_ms,
                        request_id: request_id.clone(),
                        action: action_kind_str(action).to_string(),
                        target_id: target.id.clone(),
                        label: target.raw_label.clone(),
                    });
                    self.confirmation_pending = Some(PendingAction { request_id, target, action });
                    self.state = EngineState::AwaitingConfirmation;
                } else {
                    self.highlight = Some((
                        now_ms + self.config.highlight_ms as i64,
                        PendingAction { request_id, target, action },
                    ));
                    self.state = EngineState::Executing;
                }
            }
            ResolveOutcome::Ambiguous { candidates } => {
                let details = candidates.iter().map(|t| t.id.as_str()).collect::<Vec<_>>().join(", ");
                self.emit(Event::TargetResolutionFailed {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    reason: ResolutionFailureReason::Ambiguous,
                    details: Some(details),
                });
                self.emit_engine_error(
                    Some(request_id.clone()),
                    VoiceRouterError::AmbiguousMatch(candidates.len()),
                    now_ms,
                );
                self.ambiguous_hold = Some(AmbiguousHold { request_id, candidates });
                self.state = EngineState::Error;
            }
            ResolveOutcome::NoMatch => {
                self.emit(Event::TargetResolutionFailed {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    reason: ResolutionFailureReason::NoMatch,
                    details: None,
                });
                self.emit_engine_error(Some(request_id), VoiceRouterError::NoMatch, now_ms);
                self.return_to_listening();
            }
            ResolveOutcome::Misconfiguration { detail } => {
                self.emit(Event::TargetResolutionFailed {
                    ts: now_ms,
                    request_id: request_id.clone(),
                    reason: ResolutionFailureReason::Misconfiguration,
                    details: Some(detail.clone()),
                });
                self.emit_engine_error(
                    Some(request_id),
                    VoiceRouterError::MisconfigDuplicateLabels(detail),
                    now_ms,
                );
                self.return_to_listening();
            }
        }
    }

    /// Resolve a pending ambiguous hold by a specific candidate id.
    pub fn select_disambiguation_target(&mut self, id: &str, now_ms: i64) {
        let Some(hold) = self.ambiguous_hold.take() else {
            return;
        };
        let Some(target) = hold.candidates.iter().find(|t| t.id == id).cloned() else {
            self.ambiguous_hold = Some(hold);
            return;
        };

        let request_id = hold.request_id;
        self.emit(Event::TargetResolved {
            ts: now_ms,
            request_id: request_id.clone(),
            target_id: target.id.clone(),
            label: target.raw_label.clone(),
            match_kind: crate::matcher::MatchKind::Exact,
        });
        let action = target.default_action;
        let risk_high = target.risk == Some(Risk::High);
        self.emit(Event::ActionProposed {
            ts: now_ms,
            request_id: request_id.clone(),
            action: action_kind_str(action).to_string(),
            target_id: target.id.clone(),
            risk: risk_high.then(|| "high".to_string()),
        });

        if risk_high {
            self.emit(Event::ConfirmationRequired {
                ts: now_ms,
                request_id: request_id.clone(),
                action: action_kind_str(action).to_string(),
                target_id: target.id.clone(),
                label: target.raw_label.clone(),
            });
            self.confirmation_pending = Some(PendingAction { request_id, target, action });
            self.state = EngineState::AwaitingConfirmation;
        } else {
            self.highlight = Some((
                now_ms + self.config.highlight_ms as i64,
                PendingAction { request_id, target, action },
            ));
            self.state = EngineState::Executing;
        }
    }

    pub fn confirm_action(&mut self, now_ms: i64) {
        if let Some(pending) = self.confirmation_pending.take() {
            self.state = EngineState::Executing;
            self.execute_pending(pending, now_ms);
        }
    }

    pub fn cancel_confirmation(&mut self, now_ms: i64) {
        if self.confirmation_pending.take().is_some() {
            let _ = now_ms;
            self.return_to_listening();
        }
    }

    /// Advance any armed timers (capture timeout, highlight delay) past
    /// `now_ms`. Must be called periodically by the host.
    pub fn advance_time(&mut self, now_ms: i64) {
        if self.state == EngineState::CapturingTarget {
            if let Some(deadline) = self.capture_deadline_ms {
                if now_ms >= deadline {
                    self.finish_capture(CaptureEndReason::Timeout, now_ms);
                }
            }
        }
        if self.state == EngineState::Executing {
            let expired = matches!(&self.highlight, Some((deadline, _)) if now_ms >= *deadline);
            if expired {
                if let Some((_, pending)) = self.highlight.take() {
                    self.execute_pending(pending, now_ms);
                }
            }
        }
    }

    fn execute_pending(&mut self, pending: PendingAction, now_ms: i64) {
        let result = action::execute(self.action_backend.as_mut(), pending.action, &pending.target.handle);
        match result {
            Ok(()) => self.emit(Event::ActionExecuted {
                ts: now_ms,
                request_id: pending.request_id,
                action: action_kind_str(pending.action).to_string(),
                target_id: pending.target.id,
                ok: true,
                error: None,
            }),
            Err(e) => {
                self.emit(Event::ActionExecuted {
                    ts: now_ms,
                    request_id: pending.request_id.clone(),
                    action: action_kind_str(pending.action).to_string(),
                    target_id: pending.target.id,
                    ok: false,
                    error: Some(e.to_string()),
                });
                self.emit_engine_error(Some(pending.request_id), VoiceRouterError::ExecutionFailed(e.to_string()), now_ms);
            }
        }
        self.return_to_listening();
    }

    fn return_to_listening(&mut self) {
        self.current_request_id = None;
        self.current_index = None;
        self.state = EngineState::ListeningOn;
    }

    fn emit_engine_error(&mut self, request_id: Option<String>, error: VoiceRouterError, now_ms: i64) {
        self.emit(Event::EngineError {
            ts: now_ms,
            request_id,
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        });
    }

    fn emit(&mut self, event: Event) {
        self.bus.emit(event);
    }

    pub fn on<F>(&mut self, listener: F) -> Unsubscribe
    where
        F: Fn(&Event) + Send + 'static,
    {
        self.bus.on(listener)
    }

    pub fn unsubscribe(&mut self, token: Unsubscribe) {
        self.bus.unsubscribe(token);
    }

    pub fn get_event_history(&self) -> &[Event] {
        self.bus.history()
    }

    pub fn get_state(&self) -> EngineState {
        self.state
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_current_index(&self) -> Option<&TargetIndex> {
        self.current_index.as_ref()
    }

    pub fn destroy(&mut self) {
        self.kws.stop();
        self.vad.stop();
        self.bus.clear();
        self.state = EngineState::ListeningOff;
        self.current_request_id = None;
        self.current_index = None;
        self.capture_buffer.clear();
        self.capture_deadline_ms = None;
        self.highlight = None;
        self.confirmation_pending = None;
        self.ambiguous_hold = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FakeExecutor;
    use crate::asr::FakeAsr;
    use crate::dom::test_dom::TestDom;
    use crate::dom::{ElementFacts, ElementKind};
    use crate::models::{EmbeddingStage, KeywordHead, MelStage, EMBEDDING_DIM, MEL_BINS};
    use crate::vad::VadModel;

    struct FakeMel;
    impl MelStage for FakeMel {
        fn compute(&mut self, _samples: &[f32]) -> crate::error::Result<Vec<[f32; MEL_BINS]>> {
            Ok(vec![[0.1; MEL_BINS]; 5])
        }
    }
    struct FakeEmbedding;
    impl EmbeddingStage for FakeEmbedding {
        fn compute(&mut self, _window: &[f32]) -> crate::error::Result<[f32; EMBEDDING_DIM]> {
            Ok([0.2; EMBEDDING_DIM])
        }
    }
    struct FakeHead {
        keyword: String,
    }
    impl KeywordHead for FakeHead {
        fn keyword(&self) -> &str {
            &self.keyword
        }
        fn score(&mut self, _window: &[f32]) -> crate::error::Result<f32> {
            Ok(0.0) // never fires via live audio in these tests; driven via simulate_transcript
        }
    }
    struct FakeVadModel;
    impl VadModel for FakeVadModel {
        fn reset_state(&mut self) {}
        fn predict(&mut self, _chunk: &[f32; crate::vad::VAD_CHUNK_LEN]) -> crate::error::Result<f32> {
            Ok(0.0)
        }
    }

    fn build_engine() -> Engine {
        let config = EngineConfig::default();
        let kws = KwsPipeline::new(
            Box::new(FakeMel),
            Box::new(FakeEmbedding),
            vec![Box::new(FakeHead { keyword: "open".into() })],
            &config,
        );
        let vad = VadEngine::new(Box::new(FakeVadModel), &config);
        let asr: Box<dyn AsrEngine> = Box::new(FakeAsr::new("submit"));
        let mut dom = TestDom::new();
        dom.push_element(
            ElementKind::Button,
            ElementFacts {
                visible_text: Some("Submit".into()),
                visible: true,
                ..Default::default()
            },
        );
        let dom_adapter: Box<dyn DomAdapter> = Box::new(dom);
        let action_backend: Box<dyn ActionExecutorBackend> = Box::new(FakeExecutor::new());
        let mut engine = Engine::new(config, kws, vad, asr, dom_adapter, action_backend);
        engine.start_listening(0);
        engine
    }

    #[test]
    fn simulate_transcript_resolves_and_executes_exact_click() {
        let mut engine = build_engine();
        engine.simulate_transcript("submit", 0);
        assert_eq!(engine.get_state(), EngineState::Executing);
        engine.advance_time(1000); // past highlightMs
        assert_eq!(engine.get_state(), EngineState::ListeningOn);

        let executed = engine
            .get_event_history()
            .iter()
            .any(|e| matches!(e, Event::ActionExecuted { ok: true, .. }));
        assert!(executed, "expected a successful ActionExecuted event");
    }

    #[test]
    fn simulate_transcript_no_match_returns_to_listening_with_error() {
        let mut engine = build_engine();
        engine.simulate_transcript("nonexistent thing", 0);
        assert_eq!(engine.get_state(), EngineState::ListeningOn);
        let has_error = engine
            .get_event_history()
            .iter()
            .any(|e| matches!(e, Event::EngineError { code, .. } if code == "NO_MATCH"));
        assert!(has_error);
    }

    #[test]
    fn ambiguous_resolution_holds_until_disambiguated() {
        let mut engine = build_engine();
        // Add a second, identically-labeled button so exact match is ambiguous.
        // (disambiguate policy is the default)
        engine.dom_adapter = {
            let mut dom = TestDom::new();
            dom.push_element(
                ElementKind::Button,
                ElementFacts {
                    visible_text: Some("Submit".into()),
                    visible: true,
                    ..Default::default()
                },
            );
            dom.push_element(
                ElementKind::Button,
                ElementFacts {
                    visible_text: Some("Submit".into()),
                    visible: true,
                    ..Default::default()
                },
            );
            Box::new(dom)
        };
        engine.simulate_transcript("submit", 0);
        assert_eq!(engine.get_state(), EngineState::Error);
        assert!(engine.ambiguous_hold.is_some());

        let candidate_id = engine.ambiguous_hold.as_ref().unwrap().candidates[0].id.clone();
        engine.select_disambiguation_target(&candidate_id, 100);
        assert_eq!(engine.get_state(), EngineState::Executing);
    }

    #[test]
    fn cancel_during_capture_discards_buffer_and_returns_to_listening() {
        let mut engine = build_engine();
        engine.start_capture(0);
        assert_eq!(engine.get_state(), EngineState::CapturingTarget);
        engine.cancel(50);
        assert_eq!(engine.get_state(), EngineState::ListeningOn);
        assert!(engine.capture_buffer.is_empty());
    }

    #[test]
    fn stop_listening_cancels_in_flight_request_first() {
        let mut engine = build_engine();
        engine.start_capture(0);
        engine.stop_listening(10);
        assert_eq!(engine.get_state(), EngineState::ListeningOff);
    }

    #[test]
    fn ambiguous_resolution_emits_ambiguous_match_error() {
        let mut engine = build_engine();
        engine.dom_adapter = {
            let mut dom = TestDom::new();
            dom.push_element(
                ElementKind::Button,
                ElementFacts {
                    visible_text: Some("Submit".into()),
                    visible: true,
                    ..Default::default()
                },
            );
            dom.push_element(
                ElementKind::Button,
                ElementFacts {
                    visible_text: Some("Submit".into()),
                    visible: true,
                    ..Default::default()
                },
            );
            Box::new(dom)
        };
        engine.simulate_transcript("submit", 0);
        let has_error = engine
            .get_event_history()
            .iter()
            .any(|e| matches!(e, Event::EngineError { code, .. } if code == "AMBIGUOUS_MATCH"));
        assert!(has_error, "expected an EngineError{{AMBIGUOUS_MATCH}} alongside the TargetResolutionFailed event");
    }

    #[test]
    fn execution_failure_emits_action_executed_false_and_execution_failed_error() {
        let mut engine = build_engine();
        engine.action_backend = Box::new(FakeExecutor {
            fail_with: Some("detached node".into()),
            ..Default::default()
        });
        engine.simulate_transcript("submit", 0);
        engine.advance_time(1000); // past highlightMs, drives execute_pending

        let history = engine.get_event_history();
        assert!(history.iter().any(|e| matches!(e, Event::ActionExecuted { ok: false, .. })));
        assert!(history
            .iter()
            .any(|e| matches!(e, Event::EngineError { code, .. } if code == "EXECUTION_FAILED")));
        assert_eq!(engine.get_state(), EngineState::ListeningOn);
    }

    #[test]
    fn empty_target_index_emits_misconfig_no_addressable_targets() {
        let mut engine = build_engine();
        engine.dom_adapter = Box::new(TestDom::new());
        engine.simulate_transcript("submit", 0);

        let history = engine.get_event_history();
        assert!(history
            .iter()
            .any(|e| matches!(e, Event::TargetResolutionFailed { reason, .. } if format!("{reason:?}") == "Misconfiguration")));
        assert!(history
            .iter()
            .any(|e| matches!(e, Event::EngineError { code, .. } if code == "MISCONFIG_NO_ADDRESSABLE_TARGETS")));
        assert_eq!(engine.get_state(), EngineState::ListeningOn);
    }
}
