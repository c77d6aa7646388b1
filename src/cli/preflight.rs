//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting operations
//! that would otherwise fail midway through a download.

use crate::cli::Output;
use crate::error::{OppsumError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Summarization may download, transcribe, and run the assistant.
    Summarize,
    /// Transcript fetching may download and transcribe.
    Transcript,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all hard requirements pass, or an error describing
/// what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Summarize | Operation::Transcript => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
    }
    Ok(())
}

/// Warn (without failing) when the OpenAI key is missing.
///
/// Caption-only videos summarize fine without it; anything that needs
/// speech-to-text will not.
pub fn warn_if_no_openai_key() {
    if !crate::transcription::is_api_key_configured() {
        Output::warning(
            "OPENAI_API_KEY is not set. Videos without captions cannot be transcribed.",
        );
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(OppsumError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OppsumError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(OppsumError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
