//! Oppsum - YouTube Video Summarizer
//!
//! Fetches a YouTube video's transcript content and produces a concise
//! summary. The name comes from the Norwegian "oppsummere" (to sum up).
//!
//! # Overview
//!
//! YouTube blocks automated traffic unpredictably, so content acquisition is
//! a fallback chain rather than a single download call:
//!
//! 1. Existing captions (no media download, no blocking surface)
//! 2. Direct audio download under a sequence of client identities
//! 3. A hosted conversion API, when a key is configured
//!
//! Audio that makes it through is transcribed with OpenAI Whisper; the
//! transcript is summarized by a CLI-driven assistant.
//!
//! # Architecture
//!
//! - `config` - Settings file and once-per-process secret resolution
//! - `video` - Video reference parsing and validation
//! - `acquisition` - The fallback chain: captions, downloads, remote API
//! - `audio` - ffmpeg/ffprobe helpers
//! - `transcription` - Speech-to-text
//! - `summarize` - CLI-assistant summarization
//! - `pipeline` - End-to-end coordination
//! - `cli` - Command-line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use oppsum::config::Settings;
//! use oppsum::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let report = pipeline.summarize("dQw4w9WgXcQ", None).await?;
//!     println!("{}", report.summary);
//!
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod summarize;
pub mod transcription;
pub mod video;

pub use error::{OppsumError, Result};
