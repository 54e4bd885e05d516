//! ONNX Runtime (`ort`) backed implementations of the KWS inference
//! stages. Mirrors the teacher's `EmbeddingModel`/`WakewordModel` shape:
//! load once, validate input length on every call, map backend errors
//! into [`crate::error::VoiceRouterError`].

use ort::session::Session;
use ort::value::Value;

use super::{EmbeddingStage, KeywordHead, MelStage, EMBEDDING_DIM, EMBEDDING_WINDOW, MEL_BINS};
use crate::error::{Result, VoiceRouterError};

fn load_session(path: &str) -> Result<Session> {
    Session::builder()
        .map_err(|e| VoiceRouterError::KwsInitFailed(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| VoiceRouterError::KwsInitFailed(format!("loading {path}: {e}")))
}

/// Mel spectrogram stage: `[1, N] -> [1, frames, 32]`.
pub struct OnnxMelStage {
    session: Session,
}

impl OnnxMelStage {
    pub fn new(model_path: &str) -> Result<Self> {
        log::info!("loading mel stage model from {model_path}");
        Ok(Self {
            session: load_session(model_path)?,
        })
    }
}

impl MelStage for OnnxMelStage {
    fn compute(&mut self, context_and_frame: &[f32]) -> Result<Vec<[f32; MEL_BINS]>> {
        let n = context_and_frame.len();
        let input = Value::from_array(([1usize, n], context_and_frame.to_vec()))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| VoiceRouterError::Inference(format!("mel inference: {e}")))?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;

        if raw.len() % MEL_BINS != 0 {
            return Err(VoiceRouterError::Inference(format!(
                "mel output length {} is not a multiple of {MEL_BINS}",
                raw.len()
            )));
        }

        // Apply the load-bearing affine transform: x <- x/10 + 2.
        let frames = raw
            .chunks_exact(MEL_BINS)
            .map(|chunk| {
                let mut frame = [0.0f32; MEL_BINS];
                for (dst, &src) in frame.iter_mut().zip(chunk) {
                    *dst = src / 10.0 + 2.0;
                }
                frame
            })
            .collect();
        Ok(frames)
    }
}

/// Embedding stage: `[1, 76, 32, 1] -> [1, 96]`.
pub struct OnnxEmbeddingStage {
    session: Session,
}

impl OnnxEmbeddingStage {
    pub fn new(model_path: &str) -> Result<Self> {
        log::info!("loading embedding stage model from {model_path}");
        Ok(Self {
            session: load_session(model_path)?,
        })
    }
}

impl EmbeddingStage for OnnxEmbeddingStage {
    fn compute(&mut self, window: &[f32]) -> Result<[f32; EMBEDDING_DIM]> {
        let expected = EMBEDDING_WINDOW * MEL_BINS;
        if window.len() != expected {
            return Err(VoiceRouterError::InvalidInput(format!(
                "embedding stage expects {expected} features (76x32), got {}",
                window.len()
            )));
        }
        let input = Value::from_array(([1usize, EMBEDDING_WINDOW, MEL_BINS, 1usize], window.to_vec()))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| VoiceRouterError::Inference(format!("embedding inference: {e}")))?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(VoiceRouterError::Inference(format!(
                "embedding output expected {EMBEDDING_DIM} features, got {}",
                raw.len()
            )));
        }
        let mut out = [0.0f32; EMBEDDING_DIM];
        out.copy_from_slice(raw);
        Ok(out)
    }
}

/// A single per-keyword classifier head: `[1, 16, 96] -> score`.
pub struct OnnxKeywordHead {
    keyword: String,
    session: Session,
}

impl OnnxKeywordHead {
    pub fn new(keyword: impl Into<String>, model_path: &str) -> Result<Self> {
        let keyword = keyword.into();
        log::info!("loading classifier head '{keyword}' from {model_path}");
        Ok(Self {
            keyword,
            session: load_session(model_path)?,
        })
    }
}

impl KeywordHead for OnnxKeywordHead {
    fn keyword(&self) -> &str {
        &self.keyword
    }

    fn score(&mut self, window: &[f32]) -> Result<f32> {
        let expected = 16 * EMBEDDING_DIM;
        if window.len() != expected {
            return Err(VoiceRouterError::InvalidInput(format!(
                "classifier head expects {expected} features (16x96), got {}",
                window.len()
            )));
        }
        let input = Value::from_array(([1usize, 16usize, EMBEDDING_DIM], window.to_vec()))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| VoiceRouterError::Inference(format!("{} inference: {e}", self.keyword)))?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        raw.first().copied().ok_or_else(|| {
            VoiceRouterError::Inference(format!("{} produced an empty score tensor", self.keyword))
        })
    }
}
