//! The acquisition fallback chain coordinator.
//!
//! Strategies run strictly one at a time, in priority order, short-circuiting
//! on the first success: captions, then direct download under each client
//! variant, then the hosted conversion API. Running them concurrently would
//! waste quota and bandwidth and muddy attribution of which tier worked.

use super::{
    AcquisitionAttempt, AcquisitionError, AcquisitionFailure, AcquisitionResult, CaptionSource,
    ClientVariant, DelayProvider, JitterDelay, RapidApiService, RemoteService, VariantDownloader,
    YtDlpCaptionFetcher, YtDlpDownloader,
};
use crate::config::{AcquisitionConfig, AcquisitionSettings};
use crate::video::VideoReference;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Coordinates the caption, direct-download, and remote tiers.
pub struct AcquisitionOrchestrator {
    captions: Arc<dyn CaptionSource>,
    downloader: Arc<dyn VariantDownloader>,
    remote: Arc<dyn RemoteService>,
    delay: Arc<dyn DelayProvider>,
    variants: Vec<ClientVariant>,
    max_network_retries: u32,
}

impl AcquisitionOrchestrator {
    /// Build an orchestrator with the real yt-dlp/RapidAPI components.
    pub fn from_settings(settings: &AcquisitionSettings) -> Self {
        let captions = Arc::new(YtDlpCaptionFetcher::new(
            settings.caption_languages.clone(),
            settings.socket_timeout_seconds,
            settings.force_ipv4,
        ));
        let downloader = Arc::new(YtDlpDownloader::new(
            settings.socket_timeout_seconds,
            settings.force_ipv4,
        ));
        let remote = Arc::new(RapidApiService::new(
            &settings.rapidapi_host,
            Duration::from_secs(settings.remote_timeout_seconds),
        ));
        let delay = Arc::new(JitterDelay::new(
            Duration::from_secs(settings.min_delay_seconds),
            Duration::from_secs(settings.max_delay_seconds),
        ));
        let variants = super::downloader::variants_from_names(&settings.client_variants);

        Self::with_components(
            captions,
            downloader,
            remote,
            delay,
            variants,
            settings.max_network_retries,
        )
    }

    /// Build an orchestrator from explicit components (used by tests).
    pub fn with_components(
        captions: Arc<dyn CaptionSource>,
        downloader: Arc<dyn VariantDownloader>,
        remote: Arc<dyn RemoteService>,
        delay: Arc<dyn DelayProvider>,
        variants: Vec<ClientVariant>,
        max_network_retries: u32,
    ) -> Self {
        Self {
            captions,
            downloader,
            remote,
            delay,
            variants,
            max_network_retries,
        }
    }

    /// Acquire transcript content for a validated video reference.
    ///
    /// Produces exactly one result. On failure the full attempt log is
    /// returned so the caller can show which methods were tried.
    #[instrument(skip(self, config, workdir), fields(video_id = %video.id()))]
    pub async fn acquire(
        &self,
        video: &VideoReference,
        config: &AcquisitionConfig,
        workdir: &Path,
    ) -> AcquisitionResult {
        let mut attempts: Vec<AcquisitionAttempt> = Vec::new();

        // Tier 1: captions. Never touches a download strategy, so it cannot
        // trigger blocking.
        let started = Instant::now();
        match self.captions.fetch(video, config, workdir).await {
            Ok(Some(track)) if !track.text.is_empty() => {
                info!("Captions available ({}), skipping downloads", track.language);
                attempts.push(AcquisitionAttempt::succeeded("captions", started.elapsed()));
                return AcquisitionResult::Captions {
                    text: track.text,
                    language: track.language,
                };
            }
            Ok(_) => {
                debug!("No usable captions");
                attempts.push(AcquisitionAttempt::failed(
                    "captions",
                    AcquisitionError::NotFound(
                        "no captions available in any supported language".to_string(),
                    ),
                    started.elapsed(),
                ));
            }
            Err(e) => {
                warn!("Caption fetch failed: {}", e);
                attempts.push(AcquisitionAttempt::failed("captions", e, started.elapsed()));
            }
        }

        // Tier 2: direct download, one client identity at a time. A NotFound
        // halts the loop: retrying other identities won't fix a deleted
        // video. Everything else advances to the next variant.
        let mut video_gone = false;
        'variants: for (idx, variant) in self.variants.iter().enumerate() {
            if idx > 0 {
                self.downloader.clear_cache().await;
                self.delay.wait().await;
            }

            let strategy = format!("yt-dlp/{}", variant.name);
            let mut retries_left = self.max_network_retries;

            loop {
                let started = Instant::now();
                match self
                    .downloader
                    .download(video, config, variant, workdir)
                    .await
                {
                    Ok(artifact) => {
                        info!("Downloaded audio via {}", strategy);
                        attempts
                            .push(AcquisitionAttempt::succeeded(&strategy, started.elapsed()));
                        return AcquisitionResult::Audio(artifact);
                    }
                    Err(e) => {
                        warn!("{} failed: {}", strategy, e);
                        let transient = e.is_transient();
                        let gone = matches!(e, AcquisitionError::NotFound(_));
                        attempts.push(AcquisitionAttempt::failed(
                            &strategy,
                            e,
                            started.elapsed(),
                        ));

                        if gone {
                            video_gone = true;
                            break 'variants;
                        }
                        if transient && retries_left > 0 {
                            retries_left -= 1;
                            self.delay.wait().await;
                            continue;
                        }
                        break;
                    }
                }
            }
        }

        if video_gone {
            debug!("Video appears gone; remaining variants skipped");
        }

        // Tier 3: hosted conversion API, exactly once. Without a key the tier
        // is unavailable and skipped, not counted as a failure.
        if let Some(api_key) = config.rapidapi_key() {
            let started = Instant::now();
            match self.remote.download(video, api_key, workdir).await {
                Ok(artifact) => {
                    info!("Downloaded audio via remote conversion API");
                    attempts.push(AcquisitionAttempt::succeeded("rapidapi", started.elapsed()));
                    return AcquisitionResult::Audio(artifact);
                }
                Err(e) => {
                    warn!("Remote conversion failed: {}", e);
                    attempts.push(AcquisitionAttempt::failed(
                        "rapidapi",
                        e,
                        started.elapsed(),
                    ));
                }
            }
        } else {
            debug!("Remote tier unavailable (no API key configured), skipping");
        }

        let reason = synthesize_reason(&attempts);
        AcquisitionResult::Failure(AcquisitionFailure { attempts, reason })
    }
}

/// Pick the top-level failure reason from the attempt log.
///
/// Precedence: quota-exhausted > blocked > configuration > network >
/// not-found > unknown.
fn synthesize_reason(attempts: &[AcquisitionAttempt]) -> AcquisitionError {
    attempts
        .iter()
        .filter_map(|a| a.error())
        .max_by_key(|e| e.precedence())
        .cloned()
        .unwrap_or_else(|| AcquisitionError::Unknown("no strategies were attempted".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AttemptOutcome, AudioArtifact, CaptionTrack};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn video() -> VideoReference {
        VideoReference::parse("https://youtu.be/abc12345678").unwrap()
    }

    fn artifact() -> AudioArtifact {
        AudioArtifact {
            path: PathBuf::from("/tmp/abc12345678.mp3"),
            duration_seconds: Some(61.0),
            title: Some("Test Video".to_string()),
        }
    }

    fn variants(n: usize) -> Vec<ClientVariant> {
        crate::acquisition::DEFAULT_VARIANTS[..n].to_vec()
    }

    struct FakeCaptions {
        result: Option<CaptionTrack>,
        error: Option<AcquisitionError>,
        calls: AtomicUsize,
    }

    impl FakeCaptions {
        fn some(text: &str, language: &str) -> Self {
            Self {
                result: Some(CaptionTrack {
                    text: text.to_string(),
                    language: language.to_string(),
                }),
                error: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn none() -> Self {
            Self {
                result: None,
                error: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptionSource for FakeCaptions {
        async fn fetch(
            &self,
            _video: &VideoReference,
            _config: &AcquisitionConfig,
            _workdir: &Path,
        ) -> Result<Option<CaptionTrack>, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(self.result.clone()),
            }
        }
    }

    #[derive(Default)]
    struct FakeDownloader {
        /// One scripted outcome per download call, consumed in order.
        outcomes: Mutex<VecDeque<Result<AudioArtifact, AcquisitionError>>>,
        attempted: Mutex<Vec<String>>,
        cache_clears: AtomicUsize,
    }

    impl FakeDownloader {
        fn scripted(outcomes: Vec<Result<AudioArtifact, AcquisitionError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn attempted(&self) -> Vec<String> {
            self.attempted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VariantDownloader for FakeDownloader {
        async fn download(
            &self,
            _video: &VideoReference,
            _config: &AcquisitionConfig,
            variant: &ClientVariant,
            _workdir: &Path,
        ) -> Result<AudioArtifact, AcquisitionError> {
            self.attempted.lock().unwrap().push(variant.name.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AcquisitionError::Blocked("exhausted script".into())))
        }

        async fn clear_cache(&self) {
            self.cache_clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeRemote {
        outcome: Mutex<Option<Result<AudioArtifact, AcquisitionError>>>,
        calls: AtomicUsize,
    }

    impl FakeRemote {
        fn succeeding() -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(artifact()))),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(error: AcquisitionError) -> Self {
            Self {
                outcome: Mutex::new(Some(Err(error))),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteService for FakeRemote {
        async fn download(
            &self,
            _video: &VideoReference,
            _api_key: &str,
            _workdir: &Path,
        ) -> Result<AudioArtifact, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AcquisitionError::Unknown("called twice".into())))
        }
    }

    struct NoDelay {
        waits: AtomicUsize,
    }

    impl NoDelay {
        fn new() -> Self {
            Self {
                waits: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DelayProvider for NoDelay {
        async fn wait(&self) {
            self.waits.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        captions: Arc<FakeCaptions>,
        downloader: Arc<FakeDownloader>,
        remote: Arc<FakeRemote>,
        delay: Arc<NoDelay>,
        orchestrator: AcquisitionOrchestrator,
    }

    fn harness(
        captions: FakeCaptions,
        downloader: FakeDownloader,
        remote: FakeRemote,
        variant_count: usize,
        max_network_retries: u32,
    ) -> Harness {
        let captions = Arc::new(captions);
        let downloader = Arc::new(downloader);
        let remote = Arc::new(remote);
        let delay = Arc::new(NoDelay::new());
        let orchestrator = AcquisitionOrchestrator::with_components(
            captions.clone(),
            downloader.clone(),
            remote.clone(),
            delay.clone(),
            variants(variant_count),
            max_network_retries,
        );
        Harness {
            captions,
            downloader,
            remote,
            delay,
            orchestrator,
        }
    }

    fn with_key() -> AcquisitionConfig {
        AcquisitionConfig::new(None, None, Some("test-key".to_string()))
    }

    fn blocked() -> AcquisitionError {
        AcquisitionError::Blocked("bot check".into())
    }

    #[tokio::test]
    async fn test_captions_short_circuit_all_downloads() {
        let h = harness(
            FakeCaptions::some("hello world", "en"),
            FakeDownloader::scripted(vec![]),
            FakeRemote::succeeding(),
            2,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        match result {
            AcquisitionResult::Captions { text, language } => {
                assert_eq!(text, "hello world");
                assert_eq!(language, "en");
            }
            other => panic!("expected captions, got {:?}", other),
        }
        assert_eq!(h.captions.calls.load(Ordering::SeqCst), 1);
        assert!(h.downloader.attempted().is_empty());
        assert_eq!(h.remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_variants_tried_in_order_until_success() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(blocked()), Ok(artifact())]),
            FakeRemote::succeeding(),
            3,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        assert!(matches!(result, AcquisitionResult::Audio(_)));
        assert_eq!(h.downloader.attempted(), vec!["web", "mweb"]);
        assert_eq!(h.remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_variants_blocked_invokes_remote_exactly_once() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(blocked()), Err(blocked())]),
            FakeRemote::succeeding(),
            2,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        match result {
            AcquisitionResult::Audio(a) => assert_eq!(a.title.as_deref(), Some("Test Video")),
            other => panic!("expected audio, got {:?}", other),
        }
        assert_eq!(h.remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_takes_precedence_over_blocked() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(blocked()), Err(blocked())]),
            FakeRemote::failing(AcquisitionError::QuotaExceeded("credits gone".into())),
            2,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        match result {
            AcquisitionResult::Failure(f) => {
                assert!(matches!(f.reason, AcquisitionError::QuotaExceeded(_)));
                // earlier blocked entries are still in the log
                assert!(f
                    .attempts
                    .iter()
                    .any(|a| matches!(a.error(), Some(AcquisitionError::Blocked(_)))));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_key_skips_remote_and_reports_blocked() {
        // End-to-end scenario B: no captions, both variants blocked, no key.
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(blocked()), Err(blocked())]),
            FakeRemote::succeeding(),
            2,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &AcquisitionConfig::default(), workdir.path())
            .await;

        match result {
            AcquisitionResult::Failure(f) => {
                assert!(matches!(f.reason, AcquisitionError::Blocked(_)));
                // the skipped remote tier must not appear in the log
                assert!(!f.attempts.iter().any(|a| a.strategy == "rapidapi"));
                // captions + two variants, in invocation order
                let strategies: Vec<&str> =
                    f.attempts.iter().map(|a| a.strategy.as_str()).collect();
                assert_eq!(strategies, vec!["captions", "yt-dlp/web", "yt-dlp/mweb"]);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(h.remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_short_circuits_variants_but_not_remote() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(AcquisitionError::NotFound("deleted".into()))]),
            FakeRemote::succeeding(),
            4,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        // only the first variant ran, but the remote tier still got its shot
        assert_eq!(h.downloader.attempted(), vec!["web"]);
        assert_eq!(h.remote.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, AcquisitionResult::Audio(_)));
    }

    #[tokio::test]
    async fn test_network_error_retried_once_per_variant() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![
                Err(AcquisitionError::Network("timeout".into())),
                Err(AcquisitionError::Network("timeout".into())),
                Ok(artifact()),
            ]),
            FakeRemote::succeeding(),
            2,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        assert!(matches!(result, AcquisitionResult::Audio(_)));
        // web, web (retry), mweb
        assert_eq!(h.downloader.attempted(), vec!["web", "web", "mweb"]);
    }

    #[tokio::test]
    async fn test_cache_cleared_and_delay_between_variants() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![Err(blocked()), Err(blocked()), Err(blocked())]),
            FakeRemote::succeeding(),
            3,
            0,
        );
        let workdir = tempfile::tempdir().unwrap();

        let _ = h
            .orchestrator
            .acquire(&video(), &AcquisitionConfig::default(), workdir.path())
            .await;

        // cleared before the 2nd and 3rd variants, never before the first
        assert_eq!(h.downloader.cache_clears.load(Ordering::SeqCst), 2);
        assert_eq!(h.delay.waits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_policy_is_deterministic_for_same_configuration() {
        let workdir = tempfile::tempdir().unwrap();
        let mut runs = Vec::new();

        for _ in 0..2 {
            let h = harness(
                FakeCaptions::none(),
                FakeDownloader::scripted(vec![Err(blocked()), Err(blocked())]),
                FakeRemote::failing(AcquisitionError::Network("down".into())),
                2,
                0,
            );
            let result = h
                .orchestrator
                .acquire(&video(), &with_key(), workdir.path())
                .await;
            match result {
                AcquisitionResult::Failure(f) => {
                    runs.push(
                        f.attempts
                            .iter()
                            .map(|a| a.strategy.clone())
                            .collect::<Vec<_>>(),
                    );
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }

        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn test_caption_hard_error_does_not_abort_chain() {
        let h = harness(
            FakeCaptions {
                result: None,
                error: Some(AcquisitionError::Network("caption endpoint down".into())),
                calls: AtomicUsize::new(0),
            },
            FakeDownloader::scripted(vec![Ok(artifact())]),
            FakeRemote::succeeding(),
            1,
            1,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &AcquisitionConfig::default(), workdir.path())
            .await;

        assert!(matches!(result, AcquisitionResult::Audio(_)));
    }

    #[tokio::test]
    async fn test_failure_log_records_success_free_ordering() {
        let h = harness(
            FakeCaptions::none(),
            FakeDownloader::scripted(vec![
                Err(blocked()),
                Err(AcquisitionError::Unknown("weird".into())),
            ]),
            FakeRemote::failing(AcquisitionError::NotFound("unsupported".into())),
            2,
            0,
        );
        let workdir = tempfile::tempdir().unwrap();

        let result = h
            .orchestrator
            .acquire(&video(), &with_key(), workdir.path())
            .await;

        match result {
            AcquisitionResult::Failure(f) => {
                let strategies: Vec<&str> =
                    f.attempts.iter().map(|a| a.strategy.as_str()).collect();
                assert_eq!(
                    strategies,
                    vec!["captions", "yt-dlp/web", "yt-dlp/mweb", "rapidapi"]
                );
                assert!(f
                    .attempts
                    .iter()
                    .all(|a| matches!(a.outcome, AttemptOutcome::Failed(_))));
                // blocked outranks unknown and not-found
                assert!(matches!(f.reason, AcquisitionError::Blocked(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_synthesize_reason_empty_log() {
        let reason = synthesize_reason(&[]);
        assert!(matches!(reason, AcquisitionError::Unknown(_)));
    }
}
