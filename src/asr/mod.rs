//! Pluggable ASR capability set: `{init, transcribe, destroy}`, mirroring
//! the teacher's `AudioSource`/`AudioSink` trait split (agent/src/types.rs)
//! so the engine depends only on the capability, never on a concrete
//! model family.

pub mod whisper;

use crate::error::Result;

pub trait AsrEngine: Send {
    /// Transcribe one captured utterance. Empty input returns an empty
    /// string immediately without invoking the model.
    fn transcribe(&mut self, samples: &[f32]) -> Result<String>;
}

/// Deterministic stand-in used in tests, mirroring the teacher's
/// `StubAudioSource`.
pub struct FakeAsr {
    pub transcript: String,
}

impl FakeAsr {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

impl AsrEngine for FakeAsr {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Ok(String::new());
        }
        Ok(self.transcript.clone())
    }
}
