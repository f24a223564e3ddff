//! Local Whisper transcription over whisper.cpp GGML models.

use super::fetch::download_model;
use super::models::{ModelSize, Transcript, TranscriptSegment};
use super::Transcriber;
use crate::audio::decode_samples;
use crate::error::{Result, SkrivError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Number of inference threads when the configuration leaves it automatic.
fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4) as i32
}

/// Whisper-based transcriber.
///
/// Loads one `WhisperContext` per model size and keeps it for the lifetime of
/// the process; loading is the slow one-time operation, inference reuses the
/// cached context. Missing model files are downloaded on first use, matching
/// the behavior of the upstream model loader.
pub struct WhisperTranscriber {
    models_dir: PathBuf,
    language: String,
    threads: usize,
    auto_download: bool,
    contexts: Mutex<HashMap<ModelSize, Arc<WhisperContext>>>,
}

impl WhisperTranscriber {
    /// Create a new transcriber storing models under `models_dir`.
    pub fn new(models_dir: impl Into<PathBuf>, language: &str, threads: usize) -> Self {
        Self {
            models_dir: models_dir.into(),
            language: language.to_string(),
            threads,
            auto_download: true,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Disable automatic model downloads (missing files become errors).
    pub fn without_auto_download(mut self) -> Self {
        self.auto_download = false;
        self
    }

    /// Get or load the context for a model size.
    async fn context_for(&self, size: ModelSize) -> Result<Arc<WhisperContext>> {
        let mut contexts = self.contexts.lock().await;

        if let Some(ctx) = contexts.get(&size) {
            return Ok(ctx.clone());
        }

        let info = size.info();
        let model_path = info.path_in(&self.models_dir);

        if !model_path.exists() {
            if self.auto_download {
                download_model(info, &self.models_dir).await?;
            } else {
                return Err(SkrivError::ModelNotFound(format!(
                    "{} (download it with: skriv models download {})",
                    model_path.display(),
                    size
                )));
            }
        }

        info!("Loading Whisper model: {}", size);

        let path_str = model_path
            .to_str()
            .ok_or_else(|| {
                SkrivError::ModelNotFound(format!(
                    "model path contains non-UTF-8 characters: {}",
                    model_path.display()
                ))
            })?
            .to_string();

        let ctx = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(&path_str, WhisperContextParameters::default())
        })
        .await
        .map_err(|e| SkrivError::Transcription(format!("model load task failed: {e}")))?
        .map_err(|e| SkrivError::Transcription(format!("failed to load model: {e}")))?;

        let ctx = Arc::new(ctx);
        contexts.insert(size, ctx.clone());
        Ok(ctx)
    }

    /// Run inference on decoded samples with a loaded context.
    fn run_inference(
        ctx: &WhisperContext,
        samples: &[f32],
        language: &str,
        threads: i32,
    ) -> Result<Vec<TranscriptSegment>> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let lang: Option<&str> = if language == "auto" {
            None
        } else {
            Some(language)
        };
        params.set_language(lang);
        params.set_n_threads(threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);

        let mut state = ctx
            .create_state()
            .map_err(|e| SkrivError::Transcription(format!("context state failed: {e}")))?;

        state
            .full(params, samples)
            .map_err(|e| SkrivError::Transcription(format!("inference failed: {e}")))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SkrivError::Transcription(e.to_string()))?;

        let mut segments = Vec::with_capacity(n_segments as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SkrivError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as f64 / 100.0;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as f64 / 100.0;

            segments.push(TranscriptSegment::new(t0, t1, text.trim().to_string()));
        }

        Ok(segments)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %model))]
    async fn transcribe(&self, audio_path: &Path, model: ModelSize) -> Result<Transcript> {
        if !audio_path.exists() {
            return Err(SkrivError::MediaNotFound(audio_path.display().to_string()));
        }

        let ctx = self.context_for(model).await?;

        debug!("Decoding audio for inference");
        let samples = decode_samples(audio_path).await?;

        let threads = if self.threads == 0 {
            optimal_threads()
        } else {
            self.threads as i32
        };
        let language = self.language.clone();

        info!("Transcribing with {} model", model);

        let segments = tokio::task::spawn_blocking(move || {
            Self::run_inference(&ctx, &samples, &language, threads)
        })
        .await
        .map_err(|e| SkrivError::Transcription(format!("inference task failed: {e}")))??;

        Ok(Transcript::new(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_threads_bounds() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let transcriber =
            WhisperTranscriber::new("/nonexistent/models", "auto", 0).without_auto_download();
        let err = transcriber
            .transcribe(Path::new("/nonexistent/audio.mp3"), ModelSize::Tiny)
            .await
            .unwrap_err();
        assert!(matches!(err, SkrivError::MediaNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_model_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.mp3");
        std::fs::write(&audio, b"not really audio").unwrap();

        let transcriber =
            WhisperTranscriber::new(dir.path().join("models"), "auto", 0).without_auto_download();
        let err = transcriber
            .transcribe(&audio, ModelSize::Tiny)
            .await
            .unwrap_err();
        assert!(matches!(err, SkrivError::ModelNotFound(_)));
    }
}
