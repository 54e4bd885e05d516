//! PCM frame type and the audio-source contract the engine consumes.
//!
//! Grounded on the teacher's `AudioSource`/`AudioSink` trait split
//! (agent/src/types.rs): the core depends only on a narrow trait, never on
//! a concrete microphone API. A real host feeds frames in with
//! [`Engine::push_audio_frame`]; tests feed frames from a `Vec`.

/// 80ms of 16kHz mono float PCM: exactly 1280 samples.
pub const FRAME_LEN: usize = 1280;

/// A single fixed-size PCM frame. Every frame received by the pipeline is
/// exactly [`FRAME_LEN`] samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmFrame(pub [f32; FRAME_LEN]);

impl PcmFrame {
    pub fn silence() -> Self {
        PcmFrame([0.0; FRAME_LEN])
    }

    pub fn from_slice(samples: &[f32]) -> Option<Self> {
        if samples.len() != FRAME_LEN {
            return None;
        }
        let mut buf = [0.0f32; FRAME_LEN];
        buf.copy_from_slice(samples);
        Some(PcmFrame(buf))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Scale `[-1, 1]` float samples to 16-bit integer range, clamped.
pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(PcmFrame::from_slice(&[0.0; 100]).is_none());
        assert!(PcmFrame::from_slice(&[0.0; FRAME_LEN]).is_some());
    }

    #[test]
    fn scales_and_clamps() {
        let out = to_i16(&[-1.0, 0.0, 1.0, 2.0, -2.0]);
        assert_eq!(out, vec![-32768, 0, 32767, 32767, -32768]);
    }
}
