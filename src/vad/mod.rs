//! Voice-activity detection: re-chunks 80ms PCM frames to the VAD model's
//! native 512-sample window and runs a two-threshold hysteresis state
//! machine on top of the model's per-chunk speech probability.
//!
//! Grounded on the teacher's `VadProcessor`/`VadConfig`/`VadState`
//! (wakeword/src/vad.rs) for the overall "accumulate duration, transition
//! on threshold crossing" shape; re-parameterized per spec to use
//! separate start/end thresholds, a minimum speech duration gate, and a
//! persistent recurrent state tensor that resets on every speech-start.

pub mod onnx;

use crate::audio::PcmFrame;
use crate::config::EngineConfig;
use crate::error::Result;

pub const VAD_CHUNK_LEN: usize = 512;

/// The VAD model's prediction contract: one scalar probability per
/// 512-sample chunk, with an explicit recurrent-state reset hook.
pub trait VadModel: Send {
    fn reset_state(&mut self);
    fn predict(&mut self, chunk: &[f32; VAD_CHUNK_LEN]) -> Result<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VadState {
    Idle,
    Speech,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadEvent {
    SpeechStart,
    SpeechEnd,
}

pub struct VadEngine {
    model: Box<dyn VadModel>,
    tail: Vec<f32>,
    state: VadState,
    speech_start_ms: i64,
    last_speech_ms: i64,

    start_threshold: f32,
    end_threshold: f32,
    silence_duration_ms: u64,
    min_speech_duration_ms: u64,
}

impl VadEngine {
    pub fn new(model: Box<dyn VadModel>, config: &EngineConfig) -> Self {
        Self {
            model,
            tail: Vec::with_capacity(VAD_CHUNK_LEN),
            state: VadState::Idle,
            speech_start_ms: 0,
            last_speech_ms: 0,
            start_threshold: config.vad_start_threshold,
            end_threshold: config.vad_end_threshold,
            silence_duration_ms: config.vad_silence_ms,
            min_speech_duration_ms: config.vad_min_speech_ms,
        }
    }

    /// Clear the chunk buffer and reset to idle. Does not emit events.
    pub fn stop(&mut self) {
        self.tail.clear();
        self.state = VadState::Idle;
        self.model.reset_state();
    }

    pub fn process_frame(&mut self, frame: &PcmFrame, now_ms: i64) -> Vec<VadEvent> {
        let mut samples = Vec::with_capacity(self.tail.len() + frame.as_slice().len());
        samples.extend_from_slice(&self.tail);
        samples.extend_from_slice(frame.as_slice());

        let mut events = Vec::new();
        let mut offset = 0;
        while offset + VAD_CHUNK_LEN <= samples.len() {
            let mut chunk = [0.0f32; VAD_CHUNK_LEN];
            chunk.copy_from_slice(&samples[offset..offset + VAD_CHUNK_LEN]);
            offset += VAD_CHUNK_LEN;

            match self.model.predict(&chunk) {
                Ok(p) => {
                    if let Some(event) = self.advance(p, now_ms) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    log::warn!("VAD chunk inference failed, skipping chunk: {e}");
                }
            }
        }
        self.tail = samples[offset..].to_vec();
        events
    }

    fn advance(&mut self, p: f32, now_ms: i64) -> Option<VadEvent> {
        match self.state {
            VadState::Idle => {
                if p >= self.start_threshold {
                    self.state = VadState::Speech;
                    self.speech_start_ms = now_ms;
                    self.last_speech_ms = now_ms;
                    self.model.reset_state();
                    Some(VadEvent::SpeechStart)
                } else {
                    None
                }
            }
            VadState::Speech => {
                if p >= self.end_threshold {
                    self.last_speech_ms = now_ms;
                    None
                } else {
                    let silence_elapsed = now_ms.saturating_sub(self.last_speech_ms) as u64;
                    let speech_elapsed = now_ms.saturating_sub(self.speech_start_ms) as u64;
                    if silence_elapsed >= self.silence_duration_ms
                        && speech_elapsed >= self.min_speech_duration_ms
                    {
                        self.state = VadState::Idle;
                        Some(VadEvent::SpeechEnd)
                    } else {
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedVad {
        scores: std::collections::VecDeque<f32>,
        reset_count: usize,
    }

    impl VadModel for ScriptedVad {
        fn reset_state(&mut self) {
            self.reset_count += 1;
        }

        fn predict(&mut self, _chunk: &[f32; VAD_CHUNK_LEN]) -> Result<f32> {
            Ok(self.scores.pop_front().unwrap_or(0.0))
        }
    }

    fn frame_of(n: usize) -> Vec<PcmFrame> {
        (0..n).map(|_| PcmFrame::silence()).collect()
    }

    #[test]
    fn rechunks_1280_into_512_with_carry() {
        // 1280 / 512 = 2 remainder 256; two chunks consumed, 256 carried.
        let scripted = ScriptedVad {
            scores: std::collections::VecDeque::from(vec![0.0; 10]),
            reset_count: 0,
        };
        let config = EngineConfig::default();
        let mut vad = VadEngine::new(Box::new(scripted), &config);
        vad.process_frame(&PcmFrame::silence(), 0);
        assert_eq!(vad.tail.len(), 1280 % VAD_CHUNK_LEN);
    }

    #[test]
    fn start_then_end_after_silence_hold() {
        let scripted = ScriptedVad {
            scores: std::collections::VecDeque::from(vec![0.9, 0.9, 0.9]),
            reset_count: 0,
        };
        let config = EngineConfig::default();
        let mut vad = VadEngine::new(Box::new(scripted), &config);

        let frames = frame_of(1);
        let events = vad.process_frame(&frames[0], 0);
        assert_eq!(events, vec![VadEvent::SpeechStart]);

        // Drive low-probability chunks until past min-speech and silence hold.
        let mut saw_end = false;
        for ms in [300i64, 600, 900, 1200, 1500] {
            if vad
                .process_frame(&PcmFrame::silence(), ms)
                .contains(&VadEvent::SpeechEnd)
            {
                saw_end = true;
            }
        }
        assert!(saw_end, "expected a SpeechEnd once silence hold elapsed");
    }

    #[test]
    fn stop_clears_tail_and_resets_state() {
        let scripted = ScriptedVad {
            scores: std::collections::VecDeque::from(vec![0.9]),
            reset_count: 0,
        };
        let config = EngineConfig::default();
        let mut vad = VadEngine::new(Box::new(scripted), &config);
        vad.process_frame(&PcmFrame::silence(), 0);
        vad.stop();
        assert!(vad.tail.is_empty());
        assert_eq!(vad.state, VadState::Idle);
    }
}
