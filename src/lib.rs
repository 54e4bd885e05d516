//! Deterministic, in-browser "say what you see" voice router.
//!
//! A keyword-spotting pipeline wakes the engine, a VAD bounds the
//! capture window, an ASR engine transcribes it, a DOM indexer snapshots
//! the addressable elements on the page, and a pure matcher resolves the
//! transcript to one of them. A single state machine (`engine`) wires
//! these together; a synchronous event bus (`events`) is the only
//! contract the host UI depends on.

pub mod action;
pub mod asr;
pub mod audio;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod events;
pub mod kws;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod vad;

pub use config::{CollisionPolicy, EngineConfig};
pub use engine::{Engine, EngineState};
pub use error::{Result, VoiceRouterError};
pub use events::{CaptureEndReason, Event, ResolutionFailureReason, Unsubscribe};
