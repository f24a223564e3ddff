//! Model file acquisition.
//!
//! Missing GGML files are fetched from the whisper.cpp Hugging Face
//! repository, streamed to a partial file and renamed into place.

use super::models::ModelInfo;
use crate::error::{Result, SkrivError};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Download a model file into `models_dir`, returning its final path.
///
/// If the file is already present it is returned without re-downloading.
pub async fn download_model(info: &ModelInfo, models_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(models_dir)?;

    let target = info.path_in(models_dir);
    if target.exists() {
        info!("Model {} already present", info.file_name);
        return Ok(target);
    }

    info!(
        "Downloading {} (~{} MB) from {}",
        info.file_name, info.file_size_mb, info.url
    );

    let response = reqwest::get(info.url).await?.error_for_status()?;

    let total = response
        .content_length()
        .unwrap_or(info.file_size_mb * 1024 * 1024);

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(info.file_name.to_string());

    // Stream to a partial file so an interrupted download never leaves a
    // half-written file at the model path.
    let partial = target.with_extension("bin.part");
    let mut file = tokio::fs::File::create(&partial).await?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                pb.finish_and_clear();
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(SkrivError::ModelDownload(format!(
                    "download interrupted: {e}"
                )));
            }
        };
        file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);
    pb.finish_and_clear();

    tokio::fs::rename(&partial, &target).await?;
    info!("Model saved to {}", target.display());

    Ok(target)
}
