//! Pre-flight checks before expensive operations.
//!
//! Validates that required external tools are available before starting
//! operations that would otherwise fail midway.

use crate::error::{Result, SkrivError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcription requires the transcoding tools.
    Transcribe,
    /// The web server runs the same pipeline per request.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Transcribe | Operation::Serve => {
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash)
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SkrivError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrivError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SkrivError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
