//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::OppsumError;
use crate::pipeline::{Pipeline, TranscriptSource};
use crate::summarize::SummaryOptions;
use anyhow::Result;
use console::style;

/// Run the summarize command.
pub async fn run_summarize(
    input: &str,
    max_length: Option<u32>,
    creativity: Option<f32>,
    show_transcript: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Summarize) {
        Output::error(&format!("{}", e));
        Output::info("Run 'oppsum doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    preflight::warn_if_no_openai_key();

    let options = SummaryOptions {
        max_length: max_length.unwrap_or(settings.summary.max_length),
        creativity: creativity.unwrap_or(settings.summary.creativity),
    };

    Output::info(&format!("Processing: {}", input));

    let pipeline = Pipeline::new(settings)?;
    let spinner = Output::spinner("Acquiring and summarizing...");

    let result = pipeline.summarize(input, Some(options)).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            match &report.source {
                TranscriptSource::Captions { language } => {
                    Output::success(&format!("Used existing captions ({})", language));
                }
                TranscriptSource::Audio => {
                    Output::success("Transcribed downloaded audio");
                }
            }
            if let Some(title) = &report.title {
                Output::kv("Title", title);
            }
            Output::kv("Video", &report.video_id);

            if show_transcript {
                Output::header("Transcript");
                println!("{}", report.transcript);
            }

            Output::header("Summary");
            println!("{}", report.summary);

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
            Output::error(&format!("Failed to summarize: {}", e));
            Err(e.into())
        }
    }
}
