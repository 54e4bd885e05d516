//! Streaming keyword-spotting pipeline: mel -> embedding -> per-keyword
//! classifier heads over three fixed-capacity rings.
//!
//! Grounded on the teacher's `DetectionPipeline`/`AudioFeatures`
//! (wakeword/src/detection/pipeline.rs, wakeword/src/utils.rs): the same
//! "accumulate, slide, run when full" shape, the same
//! `x <- x/10 + 2` mel transform (here applied inside the mel stage
//! itself, see `models/onnx.rs`), generalized from one wakeword model to
//! a set of per-keyword classifier heads with independent thresholds and
//! cooldowns.

use std::collections::{HashMap, VecDeque};

use crate::audio::{to_i16, PcmFrame, FRAME_LEN};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{EmbeddingStage, KeywordHead, MelStage, EMBEDDING_DIM, EMBEDDING_WINDOW, MEL_BINS};

const CONTEXT_SAMPLES: usize = 480; // 30ms of context at 16kHz
const RAW_RING_CAP: usize = 16_000 * 2; // 2s at 16kHz
const MEL_RING_CAP: usize = 100;
const EMBEDDING_RING_CAP: usize = 120;
const CLASSIFIER_WINDOW: usize = 16;

/// A single keyword firing, reported with its raw score.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDetection {
    pub keyword: String,
    pub score: f32,
}

/// Default number of silent frames to push before live audio so the mel
/// and embedding rings are full ("Warm-up" in the spec's Design Notes).
pub const DEFAULT_WARMUP_FRAMES: usize = 15;

pub struct KwsPipeline {
    mel_stage: Box<dyn MelStage>,
    embedding_stage: Box<dyn EmbeddingStage>,
    heads: Vec<Box<dyn KeywordHead>>,

    raw_ring: VecDeque<f32>,
    mel_ring: VecDeque<[f32; MEL_BINS]>,
    embedding_ring: VecDeque<[f32; EMBEDDING_DIM]>,

    last_fired_ms: HashMap<String, i64>,
    cooldown_ms: u64,
    thresholds: HashMap<String, f32>,

    score_observer: Option<Box<dyn FnMut(&str, f32) + Send>>,
}

impl KwsPipeline {
    pub fn new(
        mel_stage: Box<dyn MelStage>,
        embedding_stage: Box<dyn EmbeddingStage>,
        heads: Vec<Box<dyn KeywordHead>>,
        config: &EngineConfig,
    ) -> Self {
        let mut raw_ring = VecDeque::with_capacity(RAW_RING_CAP);
        raw_ring.extend(std::iter::repeat(0.0f32).take(CONTEXT_SAMPLES));

        let mut thresholds = HashMap::new();
        for head in &heads {
            thresholds.insert(head.keyword().to_string(), config.threshold_for(head.keyword()));
        }

        Self {
            mel_stage,
            embedding_stage,
            heads,
            raw_ring,
            mel_ring: VecDeque::with_capacity(MEL_RING_CAP),
            embedding_ring: VecDeque::with_capacity(EMBEDDING_RING_CAP),
            last_fired_ms: HashMap::new(),
            cooldown_ms: config.cooldown_ms,
            thresholds,
            score_observer: None,
        }
    }

    /// Install an observer that receives every raw keyword score,
    /// regardless of threshold, for live metering UIs.
    pub fn set_score_observer(&mut self, observer: Box<dyn FnMut(&str, f32) + Send>) {
        self.score_observer = Some(observer);
    }

    /// Clear all three rings, releasing accumulated context.
    pub fn stop(&mut self) {
        self.raw_ring.clear();
        self.raw_ring
            .extend(std::iter::repeat(0.0f32).take(CONTEXT_SAMPLES));
        self.mel_ring.clear();
        self.embedding_ring.clear();
    }

    /// Push `n` all-zero frames through the pipeline to pre-fill the mel
    /// and embedding rings before live audio begins.
    pub fn warm_up(&mut self, n: usize, now_ms: i64) {
        let silence = PcmFrame::silence();
        for _ in 0..n {
            let _ = self.process_frame(&silence, now_ms);
        }
    }

    /// Process one 80ms PCM frame, returning every keyword that fired
    /// (passed its threshold and cleared its cooldown) this frame.
    pub fn process_frame(&mut self, frame: &PcmFrame, now_ms: i64) -> Vec<KeywordDetection> {
        let scaled = to_i16(frame.as_slice());
        for s in scaled {
            self.raw_ring.push_back(s as f32);
        }
        while self.raw_ring.len() > RAW_RING_CAP {
            self.raw_ring.pop_front();
        }

        let mel_input: Vec<f32> = self
            .raw_ring
            .iter()
            .rev()
            .take(FRAME_LEN + CONTEXT_SAMPLES)
            .rev()
            .copied()
            .collect();

        let mel_frames = match self.mel_stage.compute(&mel_input) {
            Ok(frames) => frames,
            Err(e) => {
                log::warn!("mel stage inference failed, dropping frame: {e}");
                return Vec::new();
            }
        };
        for f in mel_frames {
            self.mel_ring.push_back(f);
        }
        while self.mel_ring.len() > MEL_RING_CAP {
            self.mel_ring.pop_front();
        }

        if self.mel_ring.len() < EMBEDDING_WINDOW {
            return Vec::new();
        }

        let window: Vec<f32> = self
            .mel_ring
            .iter()
            .rev()
            .take(EMBEDDING_WINDOW)
            .rev()
            .flat_map(|f| f.iter().copied())
            .collect();

        match self.embedding_stage.compute(&window) {
            Ok(embedding) => {
                self.embedding_ring.push_back(embedding);
                while self.embedding_ring.len() > EMBEDDING_RING_CAP {
                    self.embedding_ring.pop_front();
                }
            }
            Err(e) => {
                log::warn!("embedding stage inference failed, dropping frame: {e}");
                return Vec::new();
            }
        }

        if self.embedding_ring.len() < CLASSIFIER_WINDOW {
            return Vec::new();
        }

        let stacked: Vec<f32> = self
            .embedding_ring
            .iter()
            .rev()
            .take(CLASSIFIER_WINDOW)
            .rev()
            .flat_map(|e| e.iter().copied())
            .collect();

        let mut fired = Vec::new();
        for head in self.heads.iter_mut() {
            let score = match head.score(&stacked) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("classifier head '{}' inference failed: {e}", head.keyword());
                    continue;
                }
            };

            if let Some(observer) = self.score_observer.as_mut() {
                observer(head.keyword(), score);
            }

            let threshold = *self.thresholds.get(head.keyword()).unwrap_or(&0.5);
            if score < threshold {
                continue;
            }
            let last = self.last_fired_ms.get(head.keyword()).copied();
            let ready = match last {
                Some(t) => now_ms.saturating_sub(t) as u64 >= self.cooldown_ms,
                None => true,
            };
            if ready {
                self.last_fired_ms.insert(head.keyword().to_string(), now_ms);
                fired.push(KeywordDetection {
                    keyword: head.keyword().to_string(),
                    score,
                });
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EMBEDDING_DIM, EMBEDDING_WINDOW as EW, MEL_BINS as MB};

    struct FakeMel;
    impl MelStage for FakeMel {
        fn compute(&mut self, samples: &[f32]) -> Result<Vec<[f32; MB]>> {
            // One mel frame per call, derived deterministically from input length.
            let _ = samples;
            Ok(vec![[0.1; MB]; 5])
        }
    }

    struct FakeEmbedding;
    impl EmbeddingStage for FakeEmbedding {
        fn compute(&mut self, window: &[f32]) -> Result<[f32; EMBEDDING_DIM]> {
            assert_eq!(window.len(), EW * MB);
            Ok([0.2; EMBEDDING_DIM])
        }
    }

    struct FakeHead {
        keyword: String,
        score: f32,
    }
    impl KeywordHead for FakeHead {
        fn keyword(&self) -> &str {
            &self.keyword
        }
        fn score(&mut self, window: &[f32]) -> Result<f32> {
            assert_eq!(window.len(), 16 * EMBEDDING_DIM);
            Ok(self.score)
        }
    }

    fn build(score: f32) -> KwsPipeline {
        let mut config = EngineConfig::default();
        config.kws_threshold.insert("open".to_string(), 0.5);
        config.cooldown_ms = 1500;
        KwsPipeline::new(
            Box::new(FakeMel),
            Box::new(FakeEmbedding),
            vec![Box::new(FakeHead {
                keyword: "open".to_string(),
                score,
            })],
            &config,
        )
    }

    #[test]
    fn warm_up_fills_rings_without_false_detections() {
        let mut pipeline = build(0.9);
        pipeline.warm_up(DEFAULT_WARMUP_FRAMES, 0);
        assert!(pipeline.embedding_ring.len() >= 16 || pipeline.mel_ring.len() < EW);
    }

    #[test]
    fn fires_once_then_respects_cooldown() {
        let mut pipeline = build(0.9);
        pipeline.warm_up(40, 0);

        let frame = PcmFrame::silence();
        let first = pipeline.process_frame(&frame, 1000);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].keyword, "open");

        // Within cooldown: must not fire again.
        let second = pipeline.process_frame(&frame, 1200);
        assert!(second.is_empty());

        // After cooldown elapses: fires again.
        let third = pipeline.process_frame(&frame, 1000 + 1500);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn below_threshold_never_fires() {
        let mut pipeline = build(0.1);
        pipeline.warm_up(40, 0);
        let frame = PcmFrame::silence();
        let detections = pipeline.process_frame(&frame, 1000);
        assert!(detections.is_empty());
    }

    #[test]
    fn stop_clears_all_rings() {
        let mut pipeline = build(0.9);
        pipeline.warm_up(40, 0);
        pipeline.stop();
        assert_eq!(pipeline.mel_ring.len(), 0);
        assert_eq!(pipeline.embedding_ring.len(), 0);
        assert_eq!(pipeline.raw_ring.len(), CONTEXT_SAMPLES);
    }
}
