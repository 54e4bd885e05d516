//! Minimal smoke-test binary: builds an engine over a fixed in-memory
//! page, feeds it one transcript via the simulate-transcript path, and
//! prints the resulting event stream. No audio, no ONNX models — this
//! exercises the indexer, matcher and state machine end to end.

use clap::Parser;

use voice_router::action::FakeExecutor;
use voice_router::asr::FakeAsr;
use voice_router::config::EngineConfig;
use voice_router::dom::test_dom::TestDom;
use voice_router::dom::{ElementFacts, ElementKind};
use voice_router::kws::KwsPipeline;
use voice_router::models::{EmbeddingStage, KeywordHead, MelStage, EMBEDDING_DIM, MEL_BINS};
use voice_router::vad::{VadEngine, VadModel, VAD_CHUNK_LEN};
use voice_router::Engine;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transcript to feed the engine as if it had just been spoken.
    #[arg(default_value = "submit")]
    transcript: String,
}

struct NullMel;
impl MelStage for NullMel {
    fn compute(&mut self, _samples: &[f32]) -> voice_router::Result<Vec<[f32; MEL_BINS]>> {
        Ok(vec![[0.0; MEL_BINS]; 5])
    }
}

struct NullEmbedding;
impl EmbeddingStage for NullEmbedding {
    fn compute(&mut self, _window: &[f32]) -> voice_router::Result<[f32; EMBEDDING_DIM]> {
        Ok([0.0; EMBEDDING_DIM])
    }
}

struct NullVad;
impl VadModel for NullVad {
    fn reset_state(&mut self) {}
    fn predict(&mut self, _chunk: &[f32; VAD_CHUNK_LEN]) -> voice_router::Result<f32> {
        Ok(0.0)
    }
}

fn demo_page() -> TestDom {
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
        ElementKind::AnchorWithHref,
        ElementFacts {
            visible_text: Some("Cancel".into()),
            visible: true,
            ..Default::default()
        },
    );
    dom
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = EngineConfig::default();
    let kws = KwsPipeline::new(Box::new(NullMel), Box::new(NullEmbedding), Vec::<Box<dyn KeywordHead>>::new(), &config);
    let vad = VadEngine::new(Box::new(NullVad), &config);
    let asr = Box::new(FakeAsr::new(args.transcript.clone()));
    let dom_adapter = Box::new(demo_page());
    let action_backend = Box::new(FakeExecutor::new());

    let mut engine = Engine::new(config, kws, vad, asr, dom_adapter, action_backend);
    engine.start_listening(0);
    engine.simulate_transcript(&args.transcript, 0);
    engine.advance_time(1_000);

    for event in engine.get_event_history() {
        match serde_json::to_string(event) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize event: {e}"),
        }
    }
}
