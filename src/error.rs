//! Error taxonomy for the voice router engine.
//!
//! One variant per stable error code in the public event contract, each
//! carrying a human-readable detail string. The same enum is used both
//! for `Result` returns from library calls and for the `code` field of
//! `EngineError` events (see `events.rs`).

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VoiceRouterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceRouterError {
    #[error("microphone permission denied")]
    MicPermissionDenied,

    #[error("microphone not available: {0}")]
    MicNotAvailable(String),

    #[error("KWS initialization failed: {0}")]
    KwsInitFailed(String),

    #[error("VAD initialization failed: {0}")]
    VadInitFailed(String),

    #[error("ASR initialization failed: {0}")]
    AsrInitFailed(String),

    #[error("ASR transcription failed: {0}")]
    AsrFailed(String),

    #[error("no speech detected")]
    NoSpeechDetected,

    #[error("no matching target")]
    NoMatch,

    #[error("ambiguous match: {0} candidates")]
    AmbiguousMatch(usize),

    #[error("duplicate labels in target index: {0}")]
    MisconfigDuplicateLabels(String),

    #[error("no addressable targets in scope")]
    MisconfigNoAddressableTargets,

    #[error("action execution failed: {0}")]
    ExecutionFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inference error: {0}")]
    Inference(String),
}

impl VoiceRouterError {
    /// The stable error code string carried on `EngineError` events.
    pub fn code(&self) -> &'static str {
        match self {
            VoiceRouterError::MicPermissionDenied => "MIC_PERMISSION_DENIED",
            VoiceRouterError::MicNotAvailable(_) => "MIC_NOT_AVAILABLE",
            VoiceRouterError::KwsInitFailed(_) => "KWS_INIT_FAILED",
            VoiceRouterError::VadInitFailed(_) => "VAD_INIT_FAILED",
            VoiceRouterError::AsrInitFailed(_) => "ASR_INIT_FAILED",
            VoiceRouterError::AsrFailed(_) => "ASR_FAILED",
            VoiceRouterError::NoSpeechDetected => "NO_SPEECH_DETECTED",
            VoiceRouterError::NoMatch => "NO_MATCH",
            VoiceRouterError::AmbiguousMatch(_) => "AMBIGUOUS_MATCH",
            VoiceRouterError::MisconfigDuplicateLabels(_) => "MISCONFIG_DUPLICATE_LABELS",
            VoiceRouterError::MisconfigNoAddressableTargets => {
                "MISCONFIG_NO_ADDRESSABLE_TARGETS"
            }
            VoiceRouterError::ExecutionFailed(_) => "EXECUTION_FAILED",
            VoiceRouterError::InvalidInput(_) => "INVALID_INPUT",
            VoiceRouterError::Inference(_) => "INFERENCE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(VoiceRouterError::NoMatch.code(), "NO_MATCH");
        assert_eq!(VoiceRouterError::AmbiguousMatch(3).code(), "AMBIGUOUS_MATCH");
    }
}
