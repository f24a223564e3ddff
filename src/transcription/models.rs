//! Model registry and transcript data types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whisper model size preset, trading inference speed for accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

/// All model sizes, smallest first.
pub const ALL_MODEL_SIZES: &[ModelSize] = &[
    ModelSize::Tiny,
    ModelSize::Base,
    ModelSize::Small,
    ModelSize::Medium,
    ModelSize::Large,
];

impl std::str::FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(format!(
                "Unknown model size: {} (expected tiny, base, small, medium, or large)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

impl ModelSize {
    /// Static metadata for this model size.
    pub fn info(&self) -> &'static ModelInfo {
        &MODELS[ALL_MODEL_SIZES.iter().position(|s| s == self).unwrap()]
    }
}

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Model size this entry describes.
    pub size: ModelSize,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// Approximate RAM required for inference (megabytes).
    pub ram_required_mb: u64,
    /// Download URL for the GGML file.
    pub url: &'static str,
}

/// Registry of the standard multilingual whisper.cpp GGML models.
///
/// Order matches [`ALL_MODEL_SIZES`].
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        size: ModelSize::Tiny,
        file_name: "ggml-tiny.bin",
        file_size_mb: 75,
        ram_required_mb: 390,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
    },
    ModelInfo {
        size: ModelSize::Base,
        file_name: "ggml-base.bin",
        file_size_mb: 142,
        ram_required_mb: 500,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
    },
    ModelInfo {
        size: ModelSize::Small,
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        ram_required_mb: 1_000,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
    },
    ModelInfo {
        size: ModelSize::Medium,
        file_name: "ggml-medium.bin",
        file_size_mb: 1_533,
        ram_required_mb: 2_600,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
    },
    ModelInfo {
        size: ModelSize::Large,
        file_name: "ggml-large-v3.bin",
        file_size_mb: 2_950,
        ram_required_mb: 4_700,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin",
    },
];

impl ModelInfo {
    /// Full path to the GGML file under `models_dir`.
    pub fn path_in(&self, models_dir: &std::path::Path) -> PathBuf {
        models_dir.join(self.file_name)
    }

    /// Returns true if the model file exists under `models_dir`.
    pub fn is_available(&self, models_dir: &std::path::Path) -> bool {
        self.path_in(models_dir).exists()
    }
}

// ============================================================================
// Transcript Types
// ============================================================================

/// A complete transcript with segments.
///
/// Segments carry the model's timestamps; consumers of the pipeline only use
/// the top-level text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Full transcript text (concatenated segments).
    pub text: String,
    /// Individual transcript segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);

        Self {
            text,
            segments,
            duration_seconds,
        }
    }
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_model_size_parses_all_names() {
        for size in ALL_MODEL_SIZES {
            let parsed = ModelSize::from_str(&size.to_string()).unwrap();
            assert_eq!(parsed, *size);
        }
    }

    #[test]
    fn test_model_size_parse_is_case_insensitive() {
        assert_eq!(ModelSize::from_str("TINY").unwrap(), ModelSize::Tiny);
        assert_eq!(ModelSize::from_str("Medium").unwrap(), ModelSize::Medium);
    }

    #[test]
    fn test_model_size_rejects_unknown() {
        assert!(ModelSize::from_str("huge").is_err());
        assert!(ModelSize::from_str("").is_err());
    }

    #[test]
    fn test_registry_order_matches_sizes() {
        for (i, size) in ALL_MODEL_SIZES.iter().enumerate() {
            assert_eq!(MODELS[i].size, *size);
            assert_eq!(size.info().size, *size);
        }
    }

    #[test]
    fn test_model_path_resolution() {
        let info = ModelSize::Tiny.info();
        let path = info.path_in(std::path::Path::new("/models"));
        assert!(path.to_str().unwrap().ends_with("ggml-tiny.bin"));
        assert!(!info.is_available(std::path::Path::new("/nonexistent")));
    }

    #[test]
    fn test_transcript_creation() {
        let segments = vec![
            TranscriptSegment::new(0.0, 5.0, "Hello world".to_string()),
            TranscriptSegment::new(5.0, 10.0, "This is a test".to_string()),
        ];

        let transcript = Transcript::new(segments);

        assert_eq!(transcript.text, "Hello world This is a test");
        assert_eq!(transcript.duration_seconds, 10.0);
        assert_eq!(transcript.segments.len(), 2);
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new(vec![]);
        assert_eq!(transcript.text, "");
        assert_eq!(transcript.duration_seconds, 0.0);
    }
}
