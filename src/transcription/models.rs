//! Transcript data structures.

use serde::{Deserialize, Serialize};

/// A single timestamped segment of transcribed speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }
}

/// A full transcript for one piece of media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Media ID the transcript belongs to.
    pub media_id: String,
    /// Ordered segments.
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new(media_id: String, segments: Vec<TranscriptSegment>) -> Self {
        Self { media_id, segments }
    }

    /// The full transcript as one plain-text string.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total duration covered by the segments, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_seconds)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_joins_segments() {
        let transcript = Transcript::new(
            "abc12345678".to_string(),
            vec![
                TranscriptSegment::new(0.0, 2.0, " Hello ".to_string()),
                TranscriptSegment::new(2.0, 4.0, "world.".to_string()),
                TranscriptSegment::new(4.0, 5.0, "  ".to_string()),
            ],
        );
        assert_eq!(transcript.text(), "Hello world.");
        assert_eq!(transcript.duration_seconds(), 5.0);
    }
}
