//! Caption retrieval without media download.
//!
//! Captions are the cheapest and safest tier: no stream request, no
//! bot-detection surface, no remote API quota. yt-dlp is asked for both
//! creator-provided and auto-generated tracks as VTT; the VTT is normalized
//! to plain text deterministically.

use super::downloader::classify_ytdlp_stderr;
use super::{AcquisitionError, CaptionSource, CaptionTrack};
use crate::config::AcquisitionConfig;
use crate::video::VideoReference;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// yt-dlp-backed caption fetcher.
pub struct YtDlpCaptionFetcher {
    languages: Vec<String>,
    socket_timeout_seconds: u64,
    force_ipv4: bool,
}

impl YtDlpCaptionFetcher {
    pub fn new(languages: Vec<String>, socket_timeout_seconds: u64, force_ipv4: bool) -> Self {
        let languages = if languages.is_empty() {
            vec!["en".to_string(), "en-US".to_string()]
        } else {
            languages
        };
        Self {
            languages,
            socket_timeout_seconds,
            force_ipv4,
        }
    }

    /// Pick the best caption file from the workdir: preferred languages in
    /// order, then whatever track exists.
    fn select_track(&self, workdir: &Path, video_id: &str) -> Option<(PathBuf, String)> {
        for lang in &self.languages {
            let candidate = workdir.join(format!("{}.{}.vtt", video_id, lang));
            if candidate.exists() {
                return Some((candidate, lang.clone()));
            }
        }

        // Any language beats none; recover the tag from the file name.
        let entries = std::fs::read_dir(workdir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("vtt") {
                continue;
            }
            let stem = path.file_stem()?.to_str()?;
            let language = stem
                .strip_prefix(video_id)
                .and_then(|s| s.strip_prefix('.'))
                .unwrap_or("und")
                .to_string();
            return Some((path, language));
        }

        None
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionFetcher {
    #[instrument(skip(self, config, workdir), fields(video_id = %video.id()))]
    async fn fetch(
        &self,
        video: &VideoReference,
        config: &AcquisitionConfig,
        workdir: &Path,
    ) -> std::result::Result<Option<CaptionTrack>, AcquisitionError> {
        let template = workdir.join(format!("{}.%(ext)s", video.id()));

        let mut args = vec![
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-langs".to_string(),
            self.languages.join(","),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_seconds.to_string(),
            "--output".to_string(),
            template.to_string_lossy().to_string(),
        ];

        if self.force_ipv4 {
            args.push("--force-ipv4".to_string());
        }
        if let Some(proxy) = config.proxy_url() {
            args.push("--proxy".to_string());
            args.push(proxy.to_string());
        }

        args.push(video.watch_url());

        debug!("Fetching captions (langs: {})", self.languages.join(","));

        let result = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AcquisitionError::Configuration(
                    "yt-dlp is not installed or not in PATH".to_string(),
                ));
            }
            Err(e) => {
                return Err(AcquisitionError::Unknown(format!(
                    "yt-dlp execution failed: {}",
                    e
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp caption stderr: {}", stderr);
            return Err(classify_ytdlp_stderr(&stderr));
        }

        let Some((path, language)) = self.select_track(workdir, video.id()) else {
            debug!("No caption tracks available");
            return Ok(None);
        };

        let vtt = std::fs::read_to_string(&path)
            .map_err(|e| AcquisitionError::Unknown(format!("failed to read captions: {}", e)))?;
        let text = vtt_to_text(&vtt);

        if text.is_empty() {
            return Ok(None);
        }

        debug!("Got {} chars of captions ({})", text.len(), language);
        Ok(Some(CaptionTrack { text, language }))
    }
}

/// Deterministic VTT -> plain text: drop the header, cue timings, and numeric
/// cue ids; collapse whitespace runs; keep paragraph breaks between cues.
pub fn vtt_to_text(vtt: &str) -> String {
    let mut out = String::new();
    let mut prev_blank = true;

    for line in vtt.lines() {
        let l = line.trim();
        if l.is_empty() {
            if !prev_blank {
                out.push_str("\n\n");
                prev_blank = true;
            }
            continue;
        }
        if l.eq_ignore_ascii_case("webvtt") || l.starts_with("Kind:") || l.starts_with("Language:")
        {
            continue;
        }
        if l.contains("-->") {
            // timing line
            prev_blank = false;
            continue;
        }
        if l.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !prev_blank {
            out.push(' ');
        }
        let cleaned = l.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str(&cleaned);
        prev_blank = false;
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vtt_to_text_drops_timings_and_ids() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n1\n00:00:00.000 --> 00:00:01.000\nHello   world\n\n2\n00:00:01.000 --> 00:00:02.000\nSecond line\n";
        let text = vtt_to_text(vtt);
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second line"));
        assert!(!text.contains("-->"));
        assert!(!text.contains("WEBVTT"));
    }

    #[test]
    fn test_vtt_to_text_empty_input() {
        assert_eq!(vtt_to_text("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_select_track_prefers_requested_language() {
        let workdir = tempfile::tempdir().unwrap();
        std::fs::write(workdir.path().join("abc12345678.de.vtt"), "WEBVTT").unwrap();
        std::fs::write(workdir.path().join("abc12345678.en.vtt"), "WEBVTT").unwrap();

        let fetcher = YtDlpCaptionFetcher::new(vec!["en".to_string()], 30, true);
        let (path, language) = fetcher.select_track(workdir.path(), "abc12345678").unwrap();
        assert_eq!(language, "en");
        assert!(path.ends_with("abc12345678.en.vtt"));
    }

    #[test]
    fn test_select_track_falls_back_to_any_language() {
        let workdir = tempfile::tempdir().unwrap();
        std::fs::write(workdir.path().join("abc12345678.no.vtt"), "WEBVTT").unwrap();

        let fetcher = YtDlpCaptionFetcher::new(vec!["en".to_string()], 30, true);
        let (_, language) = fetcher.select_track(workdir.path(), "abc12345678").unwrap();
        assert_eq!(language, "no");
    }

    #[test]
    fn test_select_track_none_when_no_files() {
        let workdir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpCaptionFetcher::new(vec!["en".to_string()], 30, true);
        assert!(fetcher.select_track(workdir.path(), "abc12345678").is_none());
    }
}
