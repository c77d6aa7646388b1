//! YouTube video reference parsing and validation.
//!
//! Input is validated to a canonical 11-character video ID before any
//! acquisition strategy runs. Malformed input never reaches the network.

use crate::error::{OppsumError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A validated YouTube video reference.
///
/// Immutable once constructed; the ID is guaranteed to match the
/// 11-character YouTube pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    id: String,
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:[^\s&]+&)*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

impl VideoReference {
    /// Parse a YouTube URL or bare video ID.
    ///
    /// Returns `InvalidInput` for anything that doesn't resolve to an
    /// 11-character video ID.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = video_id_regex().captures(input.trim()).ok_or_else(|| {
            OppsumError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", input))
        })?;

        // Try group 1 (URL format) then group 2 (bare ID)
        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                OppsumError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", input))
            })?;

        Ok(Self { id })
    }

    /// The canonical 11-character video ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_variants() {
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLtest",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            let video = VideoReference::parse(input).unwrap();
            assert_eq!(video.id(), "dQw4w9WgXcQ", "failed for {}", input);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "not-a-video-id", "https://example.com/video", "abc123"] {
            assert!(VideoReference::parse(input).is_err(), "accepted {}", input);
        }
    }

    #[test]
    fn test_watch_url() {
        let video = VideoReference::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            video.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
