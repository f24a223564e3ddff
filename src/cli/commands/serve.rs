//! Web UI server.
//!
//! Serves a single-page upload form and the transcription pipeline behind a
//! small JSON API.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SkrivError;
use crate::pipeline::{Pipeline, RunLog, RunRequest};
use crate::transcription::{ModelSize, MODELS};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

/// Completed run artifacts, kept for download.
struct Job {
    transcript: String,
    converted_path: Option<PathBuf>,
}

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
    settings: Settings,
    jobs: Mutex<HashMap<Uuid, Job>>,
}

/// Run the web UI server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        Output::info("Run 'skriv doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or(&settings.server.host).to_string();
    let port = port.unwrap_or(settings.server.port);

    let pipeline = Pipeline::new(&settings)?;

    let state = Arc::new(AppState {
        pipeline,
        settings,
        jobs: Mutex::new(HashMap::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/transcribe", post(transcribe))
        .route("/api/jobs/{job_id}/audio", get(download_audio))
        .route("/api/jobs/{job_id}/transcript", get(download_transcript))
        // Media uploads are far larger than the default body limit.
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024 * 1024))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Skriv Web UI");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Web UI", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Models", "GET  /api/models");
    Output::kv("Transcribe", "POST /api/transcribe");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct TranscribeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<String>,
    converted: bool,
    log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ModelEntry {
    size: String,
    file_name: String,
    file_size_mb: u64,
    available: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(include_str!("../../../static/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models_dir = state.settings.models_dir();

    let models: Vec<ModelEntry> = MODELS
        .iter()
        .map(|m| ModelEntry {
            size: m.size.to_string(),
            file_name: m.file_name.to_string(),
            file_size_mb: m.file_size_mb,
            available: m.is_available(&models_dir),
        })
        .collect();

    Json(models)
}

async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let log = RunLog::new();

    // Pull the upload out of the form before running the pipeline.
    let (upload_path, model) = match save_upload(&state, multipart, &log).await {
        Ok(parts) => parts,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(TranscribeResponse {
                    success: false,
                    job_id: None,
                    transcript: None,
                    converted: false,
                    log: log.lines(),
                    error: Some(e.to_string()),
                }),
            )
                .into_response();
        }
    };

    let request = RunRequest {
        source: upload_path,
        model,
        output: Some(state.pipeline.output_dir().join("transcript.txt")),
        keep_converted: true,
        remove_source: true,
    };

    match state.pipeline.run(&request, &log).await {
        Ok(outcome) => {
            let converted = outcome.converted_path.is_some();
            let job_id = Uuid::new_v4();

            state.jobs.lock().unwrap().insert(
                job_id,
                Job {
                    transcript: outcome.text.clone(),
                    converted_path: outcome.converted_path,
                },
            );

            Json(TranscribeResponse {
                success: true,
                job_id: Some(job_id),
                transcript: Some(outcome.text),
                converted,
                log: log.lines(),
                error: None,
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(TranscribeResponse {
                success: false,
                job_id: None,
                transcript: None,
                converted: false,
                log: log.lines(),
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

/// Extract the uploaded file and model selection from the form.
///
/// The upload is written to a uniquely-named temp path owned by this run.
async fn save_upload(
    state: &AppState,
    mut multipart: Multipart,
    log: &RunLog,
) -> crate::error::Result<(PathBuf, ModelSize)> {
    let mut upload: Option<PathBuf> = None;
    let mut model: ModelSize = state
        .settings
        .transcription
        .model
        .parse()
        .unwrap_or(ModelSize::Medium);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SkrivError::InvalidInput(format!("invalid form data: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let extension = std::path::Path::new(&file_name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("bin")
                    .to_lowercase();

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| SkrivError::InvalidInput(format!("upload failed: {e}")))?;

                let temp_dir = state.settings.temp_dir();
                std::fs::create_dir_all(&temp_dir)?;
                let path = temp_dir.join(format!("upload-{}.{}", Uuid::new_v4(), extension));
                tokio::fs::write(&path, &data).await?;

                log.push(&format!("Saved uploaded file to {}", path.display()));
                upload = Some(path);
            }
            Some("model") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| SkrivError::InvalidInput(format!("invalid model field: {e}")))?;
                model = value
                    .parse()
                    .map_err(SkrivError::InvalidInput)?;
            }
            _ => {}
        }
    }

    let path =
        upload.ok_or_else(|| SkrivError::InvalidInput("no file uploaded".to_string()))?;

    Ok((path, model))
}

async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    let converted_path = {
        let jobs = state.jobs.lock().unwrap();
        jobs.get(&job_id).and_then(|j| j.converted_path.clone())
    };

    let Some(path) = converted_path else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no converted audio for this job".to_string(),
            }),
        )
            .into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "audio/mpeg".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"converted.mp3\"".to_string(),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to read converted audio {}: {}", path.display(), e);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "converted audio no longer available".to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn download_transcript(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    let transcript = {
        let jobs = state.jobs.lock().unwrap();
        jobs.get(&job_id).map(|j| j.transcript.clone())
    };

    match transcript {
        Some(text) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"transcript.txt\"".to_string(),
                ),
            ],
            text,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown job: {}", job_id),
            }),
        )
            .into_response(),
    }
}
