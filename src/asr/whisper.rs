//! Reference ASR backend: an encoder/decoder speech model run through
//! ONNX Runtime, following spec.md §4.3 step by step. Grounded on the
//! teacher's per-model wrapper pattern (wakeword/src/models/*.rs) for
//! session loading, and on `other_examples`'s `rustfft`-based spectral
//! front-ends for the STFT.

use std::collections::HashMap;
use std::f32::consts::PI;

use num_complex::Complex32;
use ort::session::Session;
use ort::value::Value;
use rustfft::FftPlanner;

use super::AsrEngine;
use crate::error::{Result, VoiceRouterError};

const N_FFT: usize = 400;
const HOP_LENGTH: usize = 160;
const N_MELS: usize = 80;
const N_FRAMES: usize = 3000;
const SOT_TOKEN: i64 = 50258;
const LANGUAGE_EN_TOKEN: i64 = 50259;
const TRANSCRIBE_TOKEN: i64 = 50359;
const NO_TIMESTAMPS_TOKEN: i64 = 50363;
const EOT_TOKEN: i64 = 50257;
const DEFAULT_MAX_TOKENS: usize = 128;

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n as f32 - 1.0)).cos())
        .collect()
}

/// A pre-computed (non-learned) triangular mel filterbank. In a real
/// deployment this is loaded from the same artifact set as the models;
/// here it is synthesized so the front-end is self-contained.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: f32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let mel = |hz: f32| 2595.0 * (1.0 + hz / 700.0).log10();
    let inv_mel = |m: f32| 700.0 * (10f32.powf(m / 2595.0) - 1.0);

    let mel_min = mel(0.0);
    let mel_max = mel(sample_rate / 2.0);
    let points: Vec<f32> = (0..n_mels + 2)
        .map(|i| inv_mel(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();
    let bin_points: Vec<usize> = points
        .iter()
        .map(|&hz| ((n_fft as f32 + 1.0) * hz / sample_rate).floor() as usize)
        .collect();

    let mut filters = vec![vec![0.0f32; n_bins]; n_mels];
    for m in 1..=n_mels {
        let (left, center, right) = (bin_points[m - 1], bin_points[m], bin_points[m + 1]);
        for k in left..center.max(left + 1) {
            if k < n_bins && center > left {
                filters[m - 1][k] = (k - left) as f32 / (center - left) as f32;
            }
        }
        for k in center..right.max(center + 1) {
            if k < n_bins && right > center {
                filters[m - 1][k] = (right - k) as f32 / (right - center) as f32;
            }
        }
    }
    filters
}

/// Compute an `[80, frames]` log-mel spectrogram from raw samples, then
/// pad or trim it to exactly [`N_FRAMES`] along the time axis.
fn log_mel_spectrogram(samples: &[f32]) -> Vec<f32> {
    let window = hann_window(N_FFT);
    let filters = mel_filterbank(N_FFT, N_MELS, 16_000.0);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let n_bins = N_FFT / 2 + 1;
    let mut frames: Vec<Vec<f32>> = Vec::new();
    let mut pos = 0;
    while pos + N_FFT <= samples.len() {
        let mut buf: Vec<Complex32> = samples[pos..pos + N_FFT]
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex32::new(s * w, 0.0))
            .collect();
        fft.process(&mut buf);

        let power: Vec<f32> = buf[..n_bins].iter().map(|c| c.norm_sqr()).collect();
        let mel_frame: Vec<f32> = filters
            .iter()
            .map(|filter| filter.iter().zip(&power).map(|(f, p)| f * p).sum::<f32>().max(1e-10))
            .collect();
        frames.push(mel_frame);
        pos += HOP_LENGTH;
    }

    if frames.is_empty() {
        frames.push(vec![1e-10; N_MELS]);
    }

    // log10, clamp to max-8, rescale by (x+4)/4.
    let mut log_frames: Vec<Vec<f32>> = frames
        .iter()
        .map(|frame| frame.iter().map(|&p| p.log10()).collect())
        .collect();
    let max_val = log_frames
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(f32::MIN, f32::max);
    for frame in log_frames.iter_mut() {
        for v in frame.iter_mut() {
            *v = v.max(max_val - 8.0);
            *v = (*v + 4.0) / 4.0;
        }
    }

    // Pad/trim along time to exactly N_FRAMES, laid out [n_mels, N_FRAMES].
    let mut out = vec![0.0f32; N_MELS * N_FRAMES];
    let t = log_frames.len().min(N_FRAMES);
    for (frame_idx, frame) in log_frames.iter().take(t).enumerate() {
        for (mel_idx, &v) in frame.iter().enumerate() {
            out[mel_idx * N_FRAMES + frame_idx] = v;
        }
    }
    out
}

pub struct WhisperAsr {
    encoder: Session,
    decoder: Session,
    vocab: HashMap<i64, String>,
    max_tokens: usize,
}

impl WhisperAsr {
    pub fn new(encoder_path: &str, decoder_path: &str, vocab: HashMap<i64, String>) -> Result<Self> {
        log::info!("loading ASR encoder from {encoder_path}, decoder from {decoder_path}");
        let encoder = Session::builder()
            .map_err(|e| VoiceRouterError::AsrInitFailed(e.to_string()))?
            .commit_from_file(encoder_path)
            .map_err(|e| VoiceRouterError::AsrInitFailed(format!("encoder: {e}")))?;
        let decoder = Session::builder()
            .map_err(|e| VoiceRouterError::AsrInitFailed(e.to_string()))?
            .commit_from_file(decoder_path)
            .map_err(|e| VoiceRouterError::AsrInitFailed(format!("decoder: {e}")))?;
        Ok(Self {
            encoder,
            decoder,
            vocab,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    fn decode_tokens(&self, tokens: &[i64]) -> String {
        decode_tokens_with(&self.vocab, tokens)
    }
}

fn decode_tokens_with(vocab: &HashMap<i64, String>, tokens: &[i64]) -> String {
    let mut raw = String::new();
    for &t in tokens {
        if let Some(piece) = vocab.get(&t) {
            raw.push_str(piece);
        }
    }
    // Byte-level BPE space marker -> ASCII space.
    raw.replace('\u{0120}', " ").trim().to_string()
}

impl AsrEngine for WhisperAsr {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mel = log_mel_spectrogram(samples);
        let mel_input = Value::from_array(([1usize, N_MELS, N_FRAMES], mel))
            .map_err(|e| VoiceRouterError::AsrFailed(e.to_string()))?;
        let encoder_out = self
            .encoder
            .run(ort::inputs![mel_input])
            .map_err(|e| VoiceRouterError::AsrFailed(format!("encoder inference: {e}")))?;
        let (hidden_shape, hidden) = encoder_out[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoiceRouterError::AsrFailed(e.to_string()))?;

        let mut tokens = vec![SOT_TOKEN, LANGUAGE_EN_TOKEN, TRANSCRIBE_TOKEN, NO_TIMESTAMPS_TOKEN];
        for _ in 0..self.max_tokens {
            let seq_len = tokens.len();
            let token_input = Value::from_array(([1usize, seq_len], tokens.clone()))
                .map_err(|e| VoiceRouterError::AsrFailed(e.to_string()))?;
            let hidden_input = Value::from_array((hidden_shape.to_vec(), hidden.to_vec()))
                .map_err(|e| VoiceRouterError::AsrFailed(e.to_string()))?;

            let decoder_out = self
                .decoder
                .run(ort::inputs![token_input, hidden_input])
                .map_err(|e| VoiceRouterError::AsrFailed(format!("decoder inference: {e}")))?;
            let (logits_shape, logits) = decoder_out[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VoiceRouterError::AsrFailed(e.to_string()))?;

            let vocab_size = *logits_shape.last().unwrap_or(&0) as usize;
            if vocab_size == 0 {
                return Err(VoiceRouterError::AsrFailed("decoder produced empty logits".into()));
            }
            let last_step = &logits[logits.len() - vocab_size..];
            let next_token = last_step
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i as i64)
                .unwrap_or(EOT_TOKEN);

            if next_token == EOT_TOKEN {
                break;
            }
            tokens.push(next_token);
        }

        let text_tokens = &tokens[4..];
        Ok(self.decode_tokens(text_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_filterbank_has_expected_shape() {
        let filters = mel_filterbank(N_FFT, N_MELS, 16_000.0);
        assert_eq!(filters.len(), N_MELS);
        assert_eq!(filters[0].len(), N_FFT / 2 + 1);
    }

    #[test]
    fn spectrogram_is_padded_to_3000_frames() {
        let samples = vec![0.0f32; 16_000]; // 1s of silence
        let mel = log_mel_spectrogram(&samples);
        assert_eq!(mel.len(), N_MELS * N_FRAMES);
    }

    #[test]
    fn decode_maps_space_marker() {
        let mut vocab = HashMap::new();
        vocab.insert(1i64, "Hello".to_string());
        vocab.insert(2i64, "\u{0120}world".to_string());
        assert_eq!(decode_tokens_with(&vocab, &[1, 2]), "Hello world");
    }
}
