//! CLI module for Skriv.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_duration, Output};

use clap::{Parser, Subcommand};

/// Skriv - Local Audio/Video Transcription
///
/// Transcribe audio and video files locally with Whisper, from the command
/// line or a small web UI. The name "Skriv" comes from the Norwegian word
/// for "write."
#[derive(Parser, Debug)]
#[command(name = "skriv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe an audio or video file
    Transcribe {
        /// Path to the audio/video file
        file_path: String,

        /// Whisper model to use (tiny, base, small, medium, large)
        #[arg(short, long)]
        model: Option<String>,

        /// Output file path for the transcription
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage Whisper model files
    Models {
        #[command(subcommand)]
        action: Option<ModelsAction>,
    },

    /// Start the web UI server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// List models and their on-disk status
    List,

    /// Download a model file (tiny, base, small, medium, large)
    Download {
        /// Model size to download
        size: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
