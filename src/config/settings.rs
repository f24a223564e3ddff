//! Configuration settings for Skriv.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcription: TranscriptionSettings,
    pub output: OutputSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing GGML model files.
    pub models_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            models_dir: "~/.skriv/models".to_string(),
            temp_dir: "/tmp/skriv".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Default model size when none is given (tiny, base, small, medium, large).
    pub model: String,
    /// Language hint passed to the model, or "auto" for detection.
    pub language: String,
    /// Number of inference threads (0 = choose automatically).
    pub threads: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "medium".to_string(),
            language: "auto".to_string(),
            threads: 0,
        }
    }
}

/// Transcript output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory transcripts are written to, relative to the working directory
    /// unless absolute.
    pub dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SkrivError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skriv")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded models directory path.
    pub fn models_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.models_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded transcript output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.output.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.transcription.model, "medium");
        assert_eq!(settings.transcription.language, "auto");
        assert_eq!(settings.output.dir, "output");
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = PathBuf::from("/nonexistent/skriv-config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.transcription.model, "medium");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.transcription.model = "tiny".to_string();
        settings.server.port = 8080;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.transcription.model, "tiny");
        assert_eq!(reloaded.server.port, 8080);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transcription]\nmodel = \"small\"\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.transcription.model, "small");
        assert_eq!(settings.output.dir, "output");
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = Settings::expand_path("~/models");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
