//! Inference-stage traits for the KWS pipeline, and the ONNX Runtime
//! reference backend for each.
//!
//! Grounded on the teacher's per-model wrapper structs (`EmbeddingModel`,
//! `WakewordModel` in wakeword/src/models/*.rs): one small struct per
//! model, a `new(path)` constructor that loads and allocates, and a
//! `predict`/`score` method that validates input length before running
//! inference. Here each wrapper sits behind a trait so the pipeline can be
//! driven by fakes in tests, the same role the teacher's
//! `AudioSource`/`StubAudioSource` split plays.

pub mod onnx;

use crate::error::Result;

/// Raw audio (1280 samples + 480 samples of leading context) -> mel frames.
/// Each call may yield more than one mel frame (typically 5).
pub trait MelStage: Send {
    fn compute(&mut self, context_and_frame: &[f32]) -> Result<Vec<[f32; 32]>>;
}

/// 76 consecutive mel frames (2432 features, shaped `[1, 76, 32, 1]`) -> a
/// 96-dim embedding.
pub trait EmbeddingStage: Send {
    fn compute(&mut self, window: &[f32]) -> Result<[f32; 96]>;
}

/// 16 consecutive embeddings (1536 features, shaped `[1, 16, 96]`) -> a
/// scalar keyword score in `[0, 1]`.
pub trait KeywordHead: Send {
    fn keyword(&self) -> &str;
    fn score(&mut self, window: &[f32]) -> Result<f32>;
}

pub const MEL_BINS: usize = 32;
pub const EMBEDDING_DIM: usize = 96;
pub const EMBEDDING_WINDOW: usize = 76;
pub const CLASSIFIER_WINDOW: usize = 16;
