//! Qwen Coder CLI summarizer.
//!
//! Invokes the `qwen` command with the prompt; if the binary is not
//! installed, falls back to running its JS entry point via `node`. The CLI
//! mixes status chatter into stdout, so the output is filtered down to the
//! actual summary before being returned.

use super::{Summarizer, SummaryOptions};
use crate::error::{OppsumError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Status lines the CLI prints around the actual summary.
const SYSTEM_MESSAGES: &[&str] = &[
    "Loaded cached Qwen credentials.",
    "Loading Qwen model...",
    "Processing request...",
    "Generating response...",
    "Qwen Coder",
    "qwen-code",
    "Node.js",
    "npm",
];

/// CLI-driven summarizer backed by the Qwen Coder assistant.
pub struct QwenCliSummarizer {
    command: String,
    node_fallback_path: String,
    timeout: Duration,
}

impl QwenCliSummarizer {
    pub fn new(command: &str, node_fallback_path: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            node_fallback_path: node_fallback_path.to_string(),
            timeout,
        }
    }

    /// Build the summarization prompt, with title context when known.
    fn build_prompt(text: &str, video_title: Option<&str>) -> String {
        match video_title {
            Some(title) => format!(
                "You are analyzing a YouTube video titled: \"{}\"\n\n\
                 Please provide a very concise summary of the following transcript from this video:\n\n\
                 {}\n\n\
                 Create a clear, comprehensive summary that captures the main points, key \
                 information, and context from the video title.",
                title, text
            ),
            None => format!(
                "Please provide a very concise summary of the following transcript:\n\n\
                 {}\n\n\
                 Create a clear, very concise, comprehensive summary that captures the main \
                 points and key information.",
                text
            ),
        }
    }

    /// Spawn one assistant invocation with the subprocess timeout applied.
    async fn invoke(
        &self,
        program: &str,
        leading_args: &[&str],
        prompt: &str,
        generation_args: &[String],
    ) -> Result<std::io::Result<std::process::Output>> {
        let mut cmd = Command::new(program);
        cmd.args(leading_args)
            .arg("--prompt")
            .arg(prompt)
            .args(generation_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => Err(OppsumError::Summarization(
                "assistant timed out; try a shorter or captioned video".to_string(),
            )),
            Ok(io_result) => Ok(io_result),
        }
    }

    async fn run_assistant(&self, prompt: &str, options: &SummaryOptions) -> Result<String> {
        let generation_args = [
            "--max-tokens".to_string(),
            options.max_length.to_string(),
            "--temperature".to_string(),
            options.creativity.to_string(),
        ];

        // Primary: the installed CLI.
        let output = match self
            .invoke(&self.command, &[], prompt, &generation_args)
            .await?
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Fallback: node + the assistant's JS entry point.
                let node_path = std::env::var("QWEN_NODE_PATH")
                    .unwrap_or_else(|_| self.node_fallback_path.clone());
                debug!("'{}' not found, falling back to node {}", self.command, node_path);

                match self
                    .invoke("node", &[node_path.as_str()], prompt, &generation_args)
                    .await?
                {
                    Ok(output) => output,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(OppsumError::ToolNotFound(format!(
                            "{} (and no node fallback)",
                            self.command
                        )))
                    }
                    Err(e) => {
                        return Err(OppsumError::Summarization(format!(
                            "assistant execution failed: {}",
                            e
                        )))
                    }
                }
            }
            Err(e) => {
                return Err(OppsumError::Summarization(format!(
                    "assistant execution failed: {}",
                    e
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Assistant exited with error: {}", stderr);
            return Err(OppsumError::Summarization(format!(
                "assistant exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Strip CLI chatter and debug-looking lines, keeping summary content.
fn clean_output(raw: &str) -> String {
    let mut cleaned_lines = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if SYSTEM_MESSAGES.iter().any(|msg| lower.contains(&msg.to_lowercase())) {
            continue;
        }
        // Lines with brackets, braces, or path fragments are debug output,
        // not prose.
        if line.contains('[')
            || line.contains(']')
            || line.contains('{')
            || line.contains('}')
            || line.contains("C:\\")
            || line.contains("/usr/")
            || line.contains("node_modules")
        {
            continue;
        }
        cleaned_lines.push(line);
    }

    cleaned_lines.join("\n").trim().to_string()
}

#[async_trait]
impl Summarizer for QwenCliSummarizer {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn summarize(
        &self,
        text: &str,
        video_title: Option<&str>,
        options: &SummaryOptions,
    ) -> Result<String> {
        let prompt = Self::build_prompt(text, video_title);
        let raw = self.run_assistant(&prompt, options).await?;
        let summary = clean_output(&raw);

        if summary.is_empty() {
            return Err(OppsumError::Summarization(
                "assistant produced no summary content".to_string(),
            ));
        }

        Ok(summary)
    }
}
