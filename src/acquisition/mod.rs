//! Transcript content acquisition for Oppsum.
//!
//! YouTube actively blocks automated traffic, so there is no single reliable
//! way to get at a video's content. This module implements a fallback chain:
//! caption retrieval first (no media download, no blocking surface), then
//! direct audio download under a sequence of client identities, then a hosted
//! conversion API as a last resort.
//!
//! The orchestrator depends only on the traits defined here; concrete
//! yt-dlp/RapidAPI implementations live in the sibling modules.

mod captions;
mod downloader;
mod orchestrator;
mod remote;
mod workdir;

pub use captions::YtDlpCaptionFetcher;
pub use downloader::{ClientVariant, YtDlpDownloader, DEFAULT_VARIANTS};
pub use orchestrator::AcquisitionOrchestrator;
pub use remote::RapidApiService;
pub use workdir::RequestWorkdir;

use crate::config::AcquisitionConfig;
use crate::video::VideoReference;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Typed failure reasons for acquisition strategies.
///
/// Strategies never raise past their boundary; every failure is converted to
/// one of these so the orchestrator can decide whether to continue the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    /// Malformed input or a strategy invoked without its required credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The host rejected the request as automated/bot traffic.
    #[error("blocked by the video host: {0}")]
    Blocked(String),

    /// Video or captions do not exist, or the video is private/deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote API credits exhausted.
    #[error("remote API quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Timeout or connectivity problem; transient.
    #[error("network error: {0}")]
    Network(String),

    /// Anything the classifier could not place.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AcquisitionError {
    /// Rank used to synthesize the top-level failure reason from an attempt
    /// log: quota > blocked > configuration > network > not-found > unknown.
    pub fn precedence(&self) -> u8 {
        match self {
            AcquisitionError::QuotaExceeded(_) => 5,
            AcquisitionError::Blocked(_) => 4,
            AcquisitionError::Configuration(_) => 3,
            AcquisitionError::Network(_) => 2,
            AcquisitionError::NotFound(_) => 1,
            AcquisitionError::Unknown(_) => 0,
        }
    }

    /// Whether the failure is transient enough to retry the same variant.
    pub fn is_transient(&self) -> bool {
        matches!(self, AcquisitionError::Network(_))
    }

    /// A human-readable remedy suggestion for the presentation layer.
    pub fn hint(&self) -> &'static str {
        match self {
            AcquisitionError::Configuration(_) => {
                "Check the video URL and your configuration (oppsum doctor)."
            }
            AcquisitionError::Blocked(_) => {
                "The host is blocking automated downloads. Configure cookies or a proxy, \
                 or try a video that has captions."
            }
            AcquisitionError::NotFound(_) => {
                "The video may be private, deleted, or region-locked. Double-check the URL."
            }
            AcquisitionError::QuotaExceeded(_) => {
                "Your remote API credits are used up. Wait for the quota to reset or upgrade \
                 your plan; reconfiguring won't help."
            }
            AcquisitionError::Network(_) => {
                "Connectivity problem. Check your network and try again."
            }
            AcquisitionError::Unknown(_) => "An unexpected error occurred. Try again later.",
        }
    }
}

/// Outcome of a single strategy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(AcquisitionError),
}

/// Record of one strategy attempt, kept for diagnostics.
///
/// Appended in invocation order and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AcquisitionAttempt {
    /// Strategy name, e.g. `captions`, `yt-dlp/web`, `rapidapi`.
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl AcquisitionAttempt {
    pub fn succeeded(strategy: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            strategy: strategy.into(),
            outcome: AttemptOutcome::Succeeded,
            elapsed,
        }
    }

    pub fn failed(strategy: impl Into<String>, error: AcquisitionError, elapsed: Duration) -> Self {
        Self {
            strategy: strategy.into(),
            outcome: AttemptOutcome::Failed(error),
            elapsed,
        }
    }

    /// The failure carried by this attempt, if any.
    pub fn error(&self) -> Option<&AcquisitionError> {
        match &self.outcome {
            AttemptOutcome::Failed(e) => Some(e),
            AttemptOutcome::Succeeded => None,
        }
    }
}

impl std::fmt::Display for AcquisitionAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => {
                write!(f, "{}: ok ({:.1}s)", self.strategy, self.elapsed.as_secs_f64())
            }
            AttemptOutcome::Failed(e) => {
                write!(f, "{}: {} ({:.1}s)", self.strategy, e, self.elapsed.as_secs_f64())
            }
        }
    }
}

/// A caption track retrieved without downloading media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Plain caption text, timing markup stripped.
    pub text: String,
    /// BCP-47-ish language tag reported for the track.
    pub language: String,
}

/// A downloaded audio file plus extracted metadata.
///
/// Lives inside the per-request workdir; the workdir guard deletes it when
/// the request finishes, on every exit path.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub duration_seconds: Option<f64>,
    pub title: Option<String>,
}

/// The single value an orchestrator invocation produces.
#[derive(Debug)]
pub enum AcquisitionResult {
    /// Caption text was available; no media was downloaded.
    Captions { text: String, language: String },
    /// Audio was downloaded and is ready for transcription.
    Audio(AudioArtifact),
    /// Every available strategy failed.
    Failure(AcquisitionFailure),
}

/// Terminal failure: the full attempt log plus a synthesized reason.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct AcquisitionFailure {
    pub attempts: Vec<AcquisitionAttempt>,
    pub reason: AcquisitionError,
}

/// Caption retrieval tier. Must not download media or consume remote quota.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// `Ok(None)` means no captions exist in any supported language, which is
    /// distinct from a hard error.
    async fn fetch(
        &self,
        video: &VideoReference,
        config: &AcquisitionConfig,
        workdir: &Path,
    ) -> std::result::Result<Option<CaptionTrack>, AcquisitionError>;
}

/// Direct download tier, invoked once per client-strategy variant.
#[async_trait]
pub trait VariantDownloader: Send + Sync {
    async fn download(
        &self,
        video: &VideoReference,
        config: &AcquisitionConfig,
        variant: &ClientVariant,
        workdir: &Path,
    ) -> std::result::Result<AudioArtifact, AcquisitionError>;

    /// Drop any locally cached responses before the next variant runs.
    async fn clear_cache(&self);
}

/// Hosted conversion API tier. One round trip, no internal retries.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn download(
        &self,
        video: &VideoReference,
        api_key: &str,
        workdir: &Path,
    ) -> std::result::Result<AudioArtifact, AcquisitionError>;
}

/// Inter-attempt delay, injectable so tests run without real sleeps.
#[async_trait]
pub trait DelayProvider: Send + Sync {
    async fn wait(&self);
}

/// Randomized bounded delay to reduce rate-correlation between attempts.
pub struct JitterDelay {
    min: Duration,
    max: Duration,
}

impl JitterDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self { min, max }
    }
}

#[async_trait]
impl DelayProvider for JitterDelay {
    async fn wait(&self) {
        let spread = (self.max - self.min).as_millis() as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::random::<u64>() % (spread + 1)
        };
        let delay = self.min + Duration::from_millis(jitter);
        tracing::debug!("Sleeping {:.1}s before next attempt", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}
