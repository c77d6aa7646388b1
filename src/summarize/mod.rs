//! Summarization module for Oppsum.
//!
//! The summary is produced by an external CLI-driven assistant. The trait
//! keeps the pipeline testable without spawning the real tool.

mod qwen;

pub use qwen::QwenCliSummarizer;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generation parameters passed through to the assistant unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Maximum summary length, in tokens.
    pub max_length: u32,
    /// Sampling temperature.
    pub creativity: f32,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_length: 1024,
            creativity: 0.3,
        }
    }
}

/// Trait for summarization services.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize transcript text, optionally with the source video title for
    /// context. Returns a bounded-length summary string.
    async fn summarize(
        &self,
        text: &str,
        video_title: Option<&str>,
        options: &SummaryOptions,
    ) -> Result<String>;
}
