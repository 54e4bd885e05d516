//! Engine configuration: one struct, one `Default` impl, mirroring the
//! teacher's `PipelineConfig`/`VadConfig` shape.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    Disambiguate,
    Error,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Disambiguate
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Duplicate-label handling during target resolution.
    pub collision_policy: CollisionPolicy,
    /// Minimum fuzzy similarity to keep a candidate (default 0.7).
    pub fuzzy_threshold: f32,
    /// Minimum gap between best and second-best fuzzy similarity to accept
    /// the best as unique (default 0.15).
    pub fuzzy_margin: f32,
    /// Per-keyword detection threshold (default 0.5 for unlisted keywords).
    pub kws_threshold: HashMap<String, f32>,
    /// Minimum wall-time between two firings of the same keyword (ms).
    pub cooldown_ms: u64,
    /// Capture window timeout (ms).
    pub capture_timeout_ms: u64,
    /// Delay before executing a resolved non-high-risk action (ms).
    pub highlight_ms: u64,
    /// VAD: probability to transition Idle -> Speech.
    pub vad_start_threshold: f32,
    /// VAD: probability below which silence accrues toward speech-end.
    pub vad_end_threshold: f32,
    /// VAD: silence duration required to emit speech-end (ms).
    pub vad_silence_ms: u64,
    /// VAD: minimum speech duration before speech-end can fire (ms).
    pub vad_min_speech_ms: u64,
    /// Global deny selectors (opaque to the indexer; interpreted by the
    /// `DomAdapter` implementation).
    pub global_deny_selectors: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collision_policy: CollisionPolicy::default(),
            fuzzy_threshold: 0.7,
            fuzzy_margin: 0.15,
            kws_threshold: HashMap::new(),
            cooldown_ms: 1500,
            capture_timeout_ms: 5000,
            highlight_ms: 300,
            vad_start_threshold: 0.5,
            vad_end_threshold: 0.35,
            vad_silence_ms: 1000,
            vad_min_speech_ms: 250,
            global_deny_selectors: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn threshold_for(&self, keyword: &str) -> f32 {
        *self.kws_threshold.get(keyword).unwrap_or(&0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.collision_policy, CollisionPolicy::Disambiguate);
        assert_eq!(cfg.fuzzy_threshold, 0.7);
        assert_eq!(cfg.fuzzy_margin, 0.15);
        assert_eq!(cfg.cooldown_ms, 1500);
        assert_eq!(cfg.capture_timeout_ms, 5000);
        assert_eq!(cfg.highlight_ms, 300);
        assert_eq!(cfg.vad_silence_ms, 1000);
    }

    #[test]
    fn unlisted_keyword_defaults_to_half() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.threshold_for("open"), 0.5);
    }
}
