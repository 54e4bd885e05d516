//! ONNX Runtime backed Silero-style VAD model: persistent `[2, 1, 128]`
//! recurrent state plus a fixed sample-rate scalar, one probability per
//! 512-sample chunk.

use ort::session::Session;
use ort::value::Value;

use super::{VadModel, VAD_CHUNK_LEN};
use crate::error::{Result, VoiceRouterError};

const STATE_SHAPE: [usize; 3] = [2, 1, 128];
const STATE_LEN: usize = 2 * 1 * 128;

pub struct OnnxVadModel {
    session: Session,
    state: Vec<f32>,
    sample_rate: i64,
}

impl OnnxVadModel {
    pub fn new(model_path: &str, sample_rate: i64) -> Result<Self> {
        log::info!("loading VAD model from {model_path}");
        let session = Session::builder()
            .map_err(|e| VoiceRouterError::VadInitFailed(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| VoiceRouterError::VadInitFailed(format!("loading {model_path}: {e}")))?;
        Ok(Self {
            session,
            state: vec![0.0; STATE_LEN],
            sample_rate,
        })
    }
}

impl VadModel for OnnxVadModel {
    fn reset_state(&mut self) {
        self.state = vec![0.0; STATE_LEN];
    }

    fn predict(&mut self, chunk: &[f32; VAD_CHUNK_LEN]) -> Result<f32> {
        let input = Value::from_array(([1usize, VAD_CHUNK_LEN], chunk.to_vec()))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let state_input = Value::from_array((STATE_SHAPE, self.state.clone()))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let sr_input = Value::from_array(([1usize], vec![self.sample_rate]))
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input, state_input, sr_input])
            .map_err(|e| VoiceRouterError::Inference(format!("VAD inference: {e}")))?;

        let (_, prob) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        let (_, new_state) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::Inference(e.to_string()))?;
        self.state = new_state.to_vec();

        prob.first()
            .copied()
            .ok_or_else(|| VoiceRouterError::Inference("VAD produced an empty output".into()))
    }
}
