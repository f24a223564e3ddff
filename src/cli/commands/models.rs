//! Models command - list and download model files.

use crate::cli::{ModelsAction, Output};
use crate::config::Settings;
use crate::transcription::{download_model, ModelSize, MODELS};
use anyhow::Result;
use console::style;

/// Run the models command.
pub async fn run_models(action: Option<&ModelsAction>, settings: Settings) -> Result<()> {
    match action {
        None | Some(ModelsAction::List) => list_models(&settings),
        Some(ModelsAction::Download { size }) => download(size, &settings).await,
    }
}

/// List the registry with on-disk status.
fn list_models(settings: &Settings) -> Result<()> {
    let models_dir = settings.models_dir();

    Output::header("Whisper Models");
    println!();
    Output::kv("Models directory", &models_dir.display().to_string());
    println!();

    for info in MODELS {
        let status = if info.is_available(&models_dir) {
            style("downloaded").green().to_string()
        } else {
            style("not downloaded").dim().to_string()
        };

        println!(
            "  {} {:8} {:22} ~{} MB file, ~{} MB RAM  [{}]",
            style("*").cyan(),
            style(info.size.to_string()).bold(),
            info.file_name,
            info.file_size_mb,
            info.ram_required_mb,
            status
        );
    }

    println!();
    Output::info("Download with: skriv models download <size>");

    Ok(())
}

/// Download a single model file.
async fn download(size: &str, settings: &Settings) -> Result<()> {
    let size: ModelSize = size.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let info = size.info();
    let models_dir = settings.models_dir();

    if info.is_available(&models_dir) {
        Output::info(&format!(
            "Model '{}' is already downloaded ({})",
            size,
            info.path_in(&models_dir).display()
        ));
        return Ok(());
    }

    Output::info(&format!(
        "Downloading '{}' model (~{} MB)...",
        size, info.file_size_mb
    ));

    match download_model(info, &models_dir).await {
        Ok(path) => {
            Output::success(&format!("Model saved to: {}", path.display()));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Download failed: {}", e));
            Err(e.into())
        }
    }
}
