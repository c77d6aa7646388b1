//! Hosted conversion API fallback (RapidAPI).
//!
//! When every direct-download identity is blocked, a hosted YouTube-to-MP3
//! conversion service may still have access from its own network. This tier
//! is a single round trip: one conversion request, then fetching the returned
//! media link. Retries are deliberately left to the caller so quota is never
//! silently multiplied.

use super::{AcquisitionError, AudioArtifact, RemoteService};
use crate::video::VideoReference;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Response shape of the conversion endpoint.
#[derive(Debug, Deserialize)]
struct ConvertResponse {
    status: Option<String>,
    link: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    msg: Option<String>,
}

/// RapidAPI-hosted conversion service client.
pub struct RapidApiService {
    client: reqwest::Client,
    host: String,
}

impl RapidApiService {
    pub fn new(host: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            host: host.to_string(),
        }
    }

    fn map_reqwest_error(e: reqwest::Error) -> AcquisitionError {
        if e.is_timeout() || e.is_connect() {
            AcquisitionError::Network(format!("remote API unreachable: {}", e))
        } else {
            AcquisitionError::Network(format!("remote API request failed: {}", e))
        }
    }
}

/// Interpret the conversion response body into a typed outcome.
fn classify_conversion(body: &ConvertResponse) -> std::result::Result<String, AcquisitionError> {
    let msg = body.msg.clone().unwrap_or_default();

    match body.status.as_deref() {
        Some("ok") => match &body.link {
            Some(link) if !link.is_empty() => Ok(link.clone()),
            _ => Err(AcquisitionError::Unknown(
                "conversion succeeded but returned no media link".to_string(),
            )),
        },
        Some("processing") => Err(AcquisitionError::Network(
            "conversion still processing; try again later".to_string(),
        )),
        _ => {
            let lower = msg.to_lowercase();
            if lower.contains("quota") || lower.contains("limit") || lower.contains("exceeded") {
                Err(AcquisitionError::QuotaExceeded(msg))
            } else {
                Err(AcquisitionError::NotFound(if msg.is_empty() {
                    "video not supported by the conversion service".to_string()
                } else {
                    msg
                }))
            }
        }
    }
}

#[async_trait]
impl RemoteService for RapidApiService {
    #[instrument(skip(self, api_key, workdir), fields(video_id = %video.id()))]
    async fn download(
        &self,
        video: &VideoReference,
        api_key: &str,
        workdir: &Path,
    ) -> std::result::Result<AudioArtifact, AcquisitionError> {
        let endpoint = format!("https://{}/dl", self.host);

        debug!("Requesting conversion from {}", self.host);

        let response = self
            .client
            .get(&endpoint)
            .query(&[("id", video.id())])
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", &self.host)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        match response.status().as_u16() {
            429 => {
                return Err(AcquisitionError::QuotaExceeded(
                    "remote API rate/quota limit reached (HTTP 429)".to_string(),
                ))
            }
            401 | 403 => {
                return Err(AcquisitionError::Configuration(
                    "remote API rejected the configured key".to_string(),
                ))
            }
            s if !response.status().is_success() => {
                return Err(AcquisitionError::Network(format!(
                    "remote API returned HTTP {}",
                    s
                )))
            }
            _ => {}
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| AcquisitionError::Unknown(format!("unparseable API response: {}", e)))?;

        let link = classify_conversion(&body)?;

        debug!("Fetching converted audio");

        let media = self
            .client
            .get(&link)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        if !media.status().is_success() {
            return Err(AcquisitionError::Network(format!(
                "media link returned HTTP {}",
                media.status().as_u16()
            )));
        }

        let bytes = media.bytes().await.map_err(Self::map_reqwest_error)?;
        if bytes.is_empty() {
            return Err(AcquisitionError::Unknown(
                "conversion service returned an empty file".to_string(),
            ));
        }

        let path = workdir.join(format!("{}.mp3", video.id()));
        std::fs::write(&path, &bytes)
            .map_err(|e| AcquisitionError::Unknown(format!("failed to write audio: {}", e)))?;

        Ok(AudioArtifact {
            path,
            duration_seconds: body.duration,
            title: body.title,
        })
    }
}
