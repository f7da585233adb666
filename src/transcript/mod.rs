//! YouTube caption transcripts: locate a track in the tab, download it, and
//! flatten its cues to plain text.

mod captions;
mod locate;

pub use captions::parse_caption_xml;
pub use locate::{locate_caption_track, select_track, CaptionTrack};

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::TabScripting;
use crate::config::Config;
use crate::error::{BriefError, Result};
use crate::extract::ensure_usable;

/// Fetches a captions document by URL
#[async_trait]
pub trait CaptionDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET of the caption track
pub struct HttpCaptionDownloader {
    client: reqwest::Client,
}

impl HttpCaptionDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Shares the completion timeout setting, if any
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.groq.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            BriefError::ConfigError(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CaptionDownloader for HttpCaptionDownloader {
    async fn download(&self, url: &str) -> Result<String> {
        tracing::debug!("Downloading captions from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BriefError::TranscriptFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BriefError::TranscriptFetchFailed(format!(
                "captions request returned {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| BriefError::TranscriptFetchFailed(e.to_string()))
    }
}

/// A downloaded transcript and the language of its track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub language_code: String,
}

/// Locate, download and parse the transcript of the video open in `tab`.
/// Nothing is downloaded when the page exposes no usable caption track.
pub async fn fetch_transcript(
    tab: &dyn TabScripting,
    downloader: &dyn CaptionDownloader,
) -> Result<Transcript> {
    let track = locate_caption_track(tab).await?;
    let body = downloader.download(&track.url).await?;
    let text = parse_caption_xml(&body)?;
    let text = ensure_usable(Some(text), BriefError::TranscriptTooShort)?;

    tracing::info!(
        "Fetched transcript ({} chars, language: {})",
        text.chars().count(),
        track.language_code
    );

    Ok(Transcript {
        text,
        language_code: track.language_code,
    })
}
