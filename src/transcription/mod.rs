//! Speech-to-text transcription.
//!
//! The [`Transcriber`] trait is the seam between the pipeline and the model;
//! [`WhisperTranscriber`] is the production implementation over whisper.cpp
//! GGML models.

mod fetch;
mod models;
mod whisper;

pub use fetch::download_model;
pub use models::{ModelInfo, ModelSize, Transcript, TranscriptSegment, ALL_MODEL_SIZES, MODELS};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file with the given model size.
    async fn transcribe(&self, audio_path: &Path, model: ModelSize) -> Result<Transcript>;
}
