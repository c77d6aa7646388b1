//! CLI module for Oppsum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Oppsum - YouTube Video Summarizer
///
/// Fetches a video's captions (or downloads and transcribes its audio) and
/// produces a concise summary. The name comes from the Norwegian
/// "oppsummere" (to sum up).
#[derive(Parser, Debug)]
#[command(name = "oppsum")]
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
    /// Initialize Oppsum and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Summarize a YouTube video
    Summarize {
        /// YouTube URL or video ID
        input: String,

        /// Maximum summary length in tokens
        #[arg(long)]
        max_length: Option<u32>,

        /// Sampling temperature for the assistant (0.0-1.0)
        #[arg(long)]
        creativity: Option<f32>,

        /// Also print the full transcript
        #[arg(short = 't', long)]
        show_transcript: bool,
    },

    /// Fetch the transcript of a YouTube video without summarizing
    Transcript {
        /// YouTube URL or video ID
        input: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "summary.max_length")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
