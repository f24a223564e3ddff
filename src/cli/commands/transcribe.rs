//! Transcribe command implementation.

use crate::audio;
use crate::cli::preflight::{self, Operation};
use crate::cli::{format_duration, Output};
use crate::config::Settings;
use crate::pipeline::{Pipeline, RunLog, RunRequest};
use crate::transcription::ModelSize;
use anyhow::Result;
use std::path::PathBuf;

/// Run the transcribe command.
pub async fn run_transcribe(
    file_path: &str,
    model: Option<String>,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Transcribe) {
        Output::error(&format!("{}", e));
        Output::info("Run 'skriv doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let source = PathBuf::from(file_path);

    // Validate input before any work begins
    if !source.exists() {
        Output::error(&format!("File not found: {}", file_path));
        anyhow::bail!("File not found: {}", file_path);
    }

    let model: ModelSize = model
        .as_deref()
        .unwrap_or(&settings.transcription.model)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    Output::info(&format!("Transcribing: {}", file_path));
    Output::kv("Model", &model.to_string());

    if let Ok(Some(duration)) = audio::probe_duration(&source).await {
        Output::kv("Duration", &format_duration(duration));
    }

    let pipeline = Pipeline::new(&settings)?;

    let mut request = RunRequest::new(&source, model);
    request.output = output.map(PathBuf::from);

    let log = RunLog::echoing();

    match pipeline.run(&request, &log).await {
        Ok(outcome) => {
            Output::success(&format!(
                "Transcription saved to: {}",
                outcome.output_path.display()
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to transcribe: {}", e));
            Err(e.into())
        }
    }
}
