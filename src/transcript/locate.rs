use serde::Deserialize;

use crate::browser::TabScripting;
use crate::error::{BriefError, Result};

/// Reads the caption track list from the watch page's player state. Runs in
/// the tab; exceptions are caught there and returned as `{status: "error"}`.
const LOCATE_SCRIPT: &str = r#"(() => {
    try {
        const player = window.ytInitialPlayerResponse;
        if (!player || !player.captions) {
            return { status: "noCaptions" };
        }
        const renderer = player.captions.playerCaptionsTracklistRenderer;
        if (!renderer || !renderer.captionTracks) {
            return { status: "noCaptions" };
        }
        const tracks = renderer.captionTracks;
        if (tracks.length === 0) {
            return { status: "emptyTrackList" };
        }
        return {
            status: "tracks",
            tracks: tracks.map((t) => ({ baseUrl: t.baseUrl, languageCode: t.languageCode }))
        };
    } catch (e) {
        return { status: "error", error: String(e && e.message ? e.message : e) };
    }
})()"#;

/// Language preferred when several tracks exist
const PREFERRED_LANGUAGE: &str = "en";

/// One caption track of the video
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl", default)]
    pub url: String,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum LocateResult {
    NoCaptions,
    EmptyTrackList,
    Tracks { tracks: Vec<CaptionTrack> },
    Error { error: String },
}

/// English if available, otherwise the first track
pub fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == PREFERRED_LANGUAGE)
        .or_else(|| tracks.first())
}

/// Find the caption track to download for the video in `tab`
pub async fn locate_caption_track(tab: &dyn TabScripting) -> Result<CaptionTrack> {
    let value = tab.execute(LOCATE_SCRIPT).await?;
    let result = interpret(value)?;
    tracing::debug!("Selected caption track: {}", result.language_code);
    Ok(result)
}

fn interpret(value: serde_json::Value) -> Result<CaptionTrack> {
    if value.is_null() {
        return Err(BriefError::NoCaptions);
    }

    let result: LocateResult =
        serde_json::from_value(value).map_err(|e| BriefError::UnexpectedException {
            message: format!("Unexpected caption lookup result: {}", e),
        })?;

    match result {
        LocateResult::NoCaptions => Err(BriefError::NoCaptions),
        LocateResult::EmptyTrackList => Err(BriefError::EmptyTrackList),
        LocateResult::Error { error } => Err(BriefError::UnexpectedException { message: error }),
        LocateResult::Tracks { tracks } => select_track(&tracks)
            .cloned()
            .ok_or(BriefError::EmptyTrackList),
    }
}
