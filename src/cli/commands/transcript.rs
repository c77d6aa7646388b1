//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::OppsumError;
use crate::pipeline::{Pipeline, TranscriptSource};
use anyhow::Result;
use console::style;

/// Run the transcript command: acquire and print, without summarizing.
pub async fn run_transcript(
    input: &str,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcript) {
        Output::error(&format!("{}", e));
        Output::info("Run 'oppsum doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    preflight::warn_if_no_openai_key();

    Output::info(&format!("Fetching transcript: {}", input));

    let pipeline = Pipeline::new(settings)?;
    let spinner = Output::spinner("Acquiring content...");

    let result = pipeline.fetch_transcript(input).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            match &outcome.source {
                TranscriptSource::Captions { language } => {
                    Output::success(&format!("Used existing captions ({})", language));
                }
                TranscriptSource::Audio => {
                    Output::success("Transcribed downloaded audio");
                }
            }
            if let Some(title) = &outcome.title {
                Output::kv("Title", title);
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, &outcome.text)?;
                    Output::success(&format!("Transcript written to {}", path));
                }
                None => {
                    println!();
                    println!("{}", outcome.text);
                }
            }
            Ok(())
        }
        Err(OppsumError::Acquisition(failure)) => {
            Output::error(&format!("Could not acquire video content: {}", failure.reason));
            println!();
            println!("{}", style("Strategies tried:").bold());
            for attempt in &failure.attempts {
                Output::list_item(&attempt.to_string());
            }
            println!();
            Output::info(failure.reason.hint());
            Err(OppsumError::Acquisition(failure).into())
        }
        Err(e) => {
            Output::error(&format!("Failed to fetch transcript: {}", e));
            Err(e.into())
        }
    }
}
