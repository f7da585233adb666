use thiserror::Error;

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Please enter your Groq API key.")]
    MissingCredential,

    #[error("Could not extract enough text from this page.")]
    ExtractionTooShort,

    #[error("No captions available for this video.")]
    NoCaptions,

    #[error("No captions found.")]
    EmptyTrackList,

    #[error("Error fetching transcript: {0}")]
    TranscriptFetchFailed(String),

    #[error("Could not extract transcript text.")]
    TranscriptTooShort,

    #[error("Groq API error: {status} {status_text}")]
    ApiHttpError { status: u16, status_text: String },

    #[error("{message}")]
    UnexpectedException { message: String },

    #[error("Another summarization is already in progress.")]
    Busy,

    #[error("Browser not found. Please install Chrome, Brave, Edge or Chromium.")]
    BrowserNotFound,

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("CDP connection failed: {0}")]
    CdpConnectionFailed(String),

    #[error("Browser not running. Use 'tabbrief browser open <url>' first.")]
    BrowserNotRunning,

    #[error("JavaScript execution failed: {0}")]
    JavaScriptError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BriefError {
    /// Halting conditions that render as their fixed message, without the
    /// failure marker.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            BriefError::MissingCredential
                | BriefError::ExtractionTooShort
                | BriefError::TranscriptTooShort
        )
    }
}

pub type Result<T> = std::result::Result<T, BriefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_names_status() {
        let err = BriefError::ApiHttpError {
            status: 401,
            status_text: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "Groq API error: 401 Unauthorized");
    }

    #[test]
    fn notices_are_limited_to_halting_conditions() {
        assert!(BriefError::MissingCredential.is_notice());
        assert!(BriefError::ExtractionTooShort.is_notice());
        assert!(BriefError::TranscriptTooShort.is_notice());
        assert!(!BriefError::NoCaptions.is_notice());
        assert!(!BriefError::TranscriptFetchFailed("boom".into()).is_notice());
    }
}
