//! Skriv - Local Audio/Video Transcription
//!
//! A local-first tool for transcribing audio and video files with Whisper.
//!
//! The name "Skriv" comes from the Norwegian word for "write."
//!
//! # Overview
//!
//! Skriv allows you to:
//! - Transcribe local audio/video files from the command line
//! - Run a small web UI with upload, model selection, and downloads
//! - Normalize any input to MP3 via ffmpeg before transcription
//! - Manage whisper.cpp GGML model files (list, download)
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `audio` - Media detection, ffmpeg conversion, and decoding
//! - `transcription` - Speech-to-text transcription and model files
//! - `pipeline` - Run coordination shared by the CLI and web UI
//! - `cli` - Command-line interface and the web server
//!
//! # Example
//!
//! ```rust,no_run
//! use skriv::config::Settings;
//! use skriv::pipeline::{Pipeline, RunLog, RunRequest};
//! use skriv::transcription::ModelSize;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(&settings)?;
//!
//!     let request = RunRequest::new("talk.mp4", ModelSize::Tiny);
//!     let outcome = pipeline.run(&request, &RunLog::new()).await?;
//!     println!("Saved to {}", outcome.output_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod transcription;

pub use error::{Result, SkrivError};
