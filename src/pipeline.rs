//! End-to-end pipeline coordination.
//!
//! The single entry point for presentation layers (CLI and HTTP): validate
//! the input reference, acquire transcript content through the fallback
//! chain, transcribe if audio came back, then summarize.

use crate::acquisition::{AcquisitionOrchestrator, AcquisitionResult, RequestWorkdir};
use crate::config::{AcquisitionConfig, Settings};
use crate::error::{OppsumError, Result};
use crate::summarize::{QwenCliSummarizer, Summarizer, SummaryOptions};
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::video::VideoReference;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Where the transcript text came from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TranscriptSource {
    /// Existing captions; no media was downloaded or transcribed.
    Captions { language: String },
    /// Downloaded audio run through speech-to-text.
    Audio,
}

/// Transcript text plus provenance, before summarization.
#[derive(Debug, Clone)]
pub struct TranscriptOutcome {
    pub video_id: String,
    pub title: Option<String>,
    pub text: String,
    pub source: TranscriptSource,
}

/// The finished product handed back to the presentation layer.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub video_id: String,
    pub title: Option<String>,
    pub transcript: String,
    pub source: TranscriptSource,
    pub summary: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// The main Oppsum pipeline.
pub struct Pipeline {
    settings: Settings,
    config: AcquisitionConfig,
    orchestrator: AcquisitionOrchestrator,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    /// Create a pipeline with the default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let config = AcquisitionConfig::resolve(&settings.acquisition);
        let orchestrator = AcquisitionOrchestrator::from_settings(&settings.acquisition);
        let transcriber = Arc::new(WhisperTranscriber::with_config(
            &settings.transcription.model,
            settings.transcription.chunk_duration_seconds,
            settings.transcription.max_concurrent_chunks,
        ));
        let summarizer = Arc::new(QwenCliSummarizer::new(
            &settings.summary.command,
            &settings.summary.node_fallback_path,
            Duration::from_secs(settings.summary.timeout_seconds),
        ));

        Self::with_components(settings, config, orchestrator, transcriber, summarizer)
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        config: AcquisitionConfig,
        orchestrator: AcquisitionOrchestrator,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        std::fs::create_dir_all(settings.temp_dir())?;
        Ok(Self {
            settings,
            config,
            orchestrator,
            transcriber,
            summarizer,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Acquire a transcript for the given input (URL or bare video ID).
    ///
    /// The per-request workdir, and with it any downloaded audio, is removed
    /// before this returns, on every exit path.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn fetch_transcript(&self, input: &str) -> Result<TranscriptOutcome> {
        let video = VideoReference::parse(input)?;
        let workdir = RequestWorkdir::create(&self.settings.temp_dir())?;

        info!("Acquiring content for {}", video.id());

        let result = self
            .orchestrator
            .acquire(&video, &self.config, workdir.path())
            .await;

        match result {
            AcquisitionResult::Captions { text, language } => {
                info!("Using captions ({})", language);
                Ok(TranscriptOutcome {
                    video_id: video.id().to_string(),
                    title: None,
                    text,
                    source: TranscriptSource::Captions { language },
                })
            }
            AcquisitionResult::Audio(artifact) => {
                check_duration(
                    artifact.duration_seconds,
                    self.settings.transcription.max_duration_seconds,
                )?;

                info!("Transcribing downloaded audio");
                let transcript = self.transcriber.transcribe(&artifact.path).await?;
                let text = transcript.text();
                if text.is_empty() {
                    return Err(OppsumError::Transcription(
                        "transcription produced no text".to_string(),
                    ));
                }

                Ok(TranscriptOutcome {
                    video_id: video.id().to_string(),
                    title: artifact.title,
                    text,
                    source: TranscriptSource::Audio,
                })
            }
            AcquisitionResult::Failure(failure) => {
                for attempt in &failure.attempts {
                    warn!("attempt: {}", attempt);
                }
                Err(OppsumError::Acquisition(failure))
            }
        }
    }

    /// Full pipeline: acquire, transcribe if needed, summarize.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn summarize(
        &self,
        input: &str,
        options: Option<SummaryOptions>,
    ) -> Result<SummaryReport> {
        let outcome = self.fetch_transcript(input).await?;

        let options = options.unwrap_or(SummaryOptions {
            max_length: self.settings.summary.max_length,
            creativity: self.settings.summary.creativity,
        });

        info!("Summarizing {} chars of transcript", outcome.text.len());
        let summary = self
            .summarizer
            .summarize(&outcome.text, outcome.title.as_deref(), &options)
            .await?;

        Ok(SummaryReport {
            video_id: outcome.video_id,
            title: outcome.title,
            transcript: outcome.text,
            source: outcome.source,
            summary,
            generated_at: chrono::Utc::now(),
        })
    }
}

/// Reject audio that exceeds the configured duration ceiling.
fn check_duration(duration_seconds: Option<f64>, max_seconds: u32) -> Result<()> {
    if let Some(duration) = duration_seconds {
        if duration > max_seconds as f64 {
            return Err(OppsumError::InvalidInput(format!(
                "Media duration ({:.0} seconds) exceeds maximum ({} seconds)",
                duration, max_seconds
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{
        AcquisitionError, AudioArtifact, CaptionSource, CaptionTrack, ClientVariant,
        DelayProvider, RemoteService, VariantDownloader,
    };
    use crate::transcription::Transcript;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct CaptionsOnly;

    #[async_trait]
    impl CaptionSource for CaptionsOnly {
        async fn fetch(
            &self,
            _video: &VideoReference,
            _config: &AcquisitionConfig,
            _workdir: &Path,
        ) -> std::result::Result<Option<CaptionTrack>, AcquisitionError> {
            Ok(Some(CaptionTrack {
                text: "caption text".to_string(),
                language: "en".to_string(),
            }))
        }
    }

    struct NeverDownload;

    #[async_trait]
    impl VariantDownloader for NeverDownload {
        async fn download(
            &self,
            _video: &VideoReference,
            _config: &AcquisitionConfig,
            _variant: &ClientVariant,
            _workdir: &Path,
        ) -> std::result::Result<AudioArtifact, AcquisitionError> {
            panic!("downloader must not run on the caption path");
        }

        async fn clear_cache(&self) {}
    }

    struct NeverRemote;

    #[async_trait]
    impl RemoteService for NeverRemote {
        async fn download(
            &self,
            _video: &VideoReference,
            _api_key: &str,
            _workdir: &Path,
        ) -> std::result::Result<AudioArtifact, AcquisitionError> {
            panic!("remote service must not run on the caption path");
        }
    }

    struct NoDelay;

    #[async_trait]
    impl DelayProvider for NoDelay {
        async fn wait(&self) {}
    }

    struct NeverTranscribe;

    #[async_trait]
    impl Transcriber for NeverTranscribe {
        async fn transcribe(&self, _audio_path: &Path) -> Result<Transcript> {
            panic!("transcriber must not run on the caption path");
        }

        async fn transcribe_with_language(
            &self,
            _audio_path: &Path,
            _language: &str,
        ) -> Result<Transcript> {
            panic!("transcriber must not run on the caption path");
        }
    }

    struct RecordingSummarizer {
        seen_title: Mutex<Option<Option<String>>>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(
            &self,
            text: &str,
            video_title: Option<&str>,
            _options: &SummaryOptions,
        ) -> Result<String> {
            *self.seen_title.lock().unwrap() = Some(video_title.map(|s| s.to_string()));
            Ok(format!("summary of {} chars", text.len()))
        }
    }

    fn caption_pipeline(temp_root: &Path) -> (Pipeline, Arc<RecordingSummarizer>) {
        let mut settings = Settings::default();
        settings.general.temp_dir = temp_root.to_string_lossy().to_string();

        let orchestrator = AcquisitionOrchestrator::with_components(
            Arc::new(CaptionsOnly),
            Arc::new(NeverDownload),
            Arc::new(NeverRemote),
            Arc::new(NoDelay),
            vec![],
            0,
        );
        let summarizer = Arc::new(RecordingSummarizer {
            seen_title: Mutex::new(None),
        });
        let pipeline = Pipeline::with_components(
            settings,
            AcquisitionConfig::default(),
            orchestrator,
            Arc::new(NeverTranscribe),
            summarizer.clone(),
        )
        .unwrap();
        (pipeline, summarizer)
    }

    #[tokio::test]
    async fn test_caption_path_bypasses_transcriber_and_omits_title() {
        let temp = tempfile::tempdir().unwrap();
        let (pipeline, summarizer) = caption_pipeline(temp.path());

        let report = pipeline
            .summarize("https://youtu.be/abc12345678", None)
            .await
            .unwrap();

        assert_eq!(report.video_id, "abc12345678");
        assert_eq!(
            report.source,
            TranscriptSource::Captions {
                language: "en".to_string()
            }
        );
        assert_eq!(report.transcript, "caption text");
        assert_eq!(*summarizer.seen_title.lock().unwrap(), Some(None));
    }

    #[tokio::test]
    async fn test_no_residual_workdirs_after_run() {
        let temp = tempfile::tempdir().unwrap();
        let (pipeline, _) = caption_pipeline(temp.path());

        pipeline
            .summarize("abc12345678", None)
            .await
            .unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "workdir not cleaned: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_malformed_input_rejected_before_any_strategy() {
        let temp = tempfile::tempdir().unwrap();
        let (pipeline, _) = caption_pipeline(temp.path());

        let err = pipeline.summarize("not-a-video", None).await.unwrap_err();
        assert!(matches!(err, OppsumError::InvalidInput(_)));
    }

    #[test]
    fn test_duration_guard() {
        assert!(check_duration(Some(100.0), 7200).is_ok());
        assert!(check_duration(None, 7200).is_ok());
        assert!(check_duration(Some(8000.0), 7200).is_err());
    }
}
