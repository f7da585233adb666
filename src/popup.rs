//! The two summarize actions, from credential check to rendered text.
//!
//! Each action runs one linear chain (validate, extract or fetch, summarize)
//! and returns an [`Outcome`]; [`Outcome::render`] turns it into the text
//! shown to the user.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::Summarizer;
use crate::browser::TabSource;
use crate::config::Credentials;
use crate::error::{BriefError, Result};
use crate::extract::{ensure_usable, extract_visible_text};
use crate::transcript::{fetch_transcript, CaptionDownloader};

pub const PAGE_INSTRUCTION: &str = "Summarize the following webpage content:";
pub const TRANSCRIPT_INSTRUCTION: &str = "Summarize this transcript:";

/// Transcript characters shown ahead of the summary
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SummarizePage,
    SummarizeTranscript,
}

/// Progress of a running action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Extracting,
    FetchingTranscript,
    Summarizing { language_code: Option<String> },
}

impl Stage {
    pub fn message(&self) -> String {
        match self {
            Stage::Validating => "Checking API key...".to_string(),
            Stage::Extracting => "Reading page...".to_string(),
            Stage::FetchingTranscript => "Fetching transcript...".to_string(),
            Stage::Summarizing {
                language_code: None,
            } => "Summarizing page...".to_string(),
            Stage::Summarizing {
                language_code: Some(lang),
            } => format!("Summarizing transcript (language: {})...", lang),
        }
    }
}

/// Result of one action
#[derive(Debug)]
pub enum Outcome {
    PageSummary {
        summary: String,
    },
    TranscriptSummary {
        transcript: String,
        language_code: String,
        summary: String,
    },
    Failed(BriefError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    /// Text for the output area
    pub fn render(&self) -> String {
        match self {
            Outcome::PageSummary { summary } => summary.clone(),
            Outcome::TranscriptSummary {
                transcript,
                summary,
                ..
            } => {
                let preview: String = transcript.chars().take(PREVIEW_CHARS).collect();
                format!(
                    "Transcript (first {} chars):\n{}...\n\n✨ Summary:\n{}",
                    PREVIEW_CHARS, preview, summary
                )
            }
            Outcome::Failed(err) if err.is_notice() => err.to_string(),
            Outcome::Failed(err) => format!("X{}", err),
        }
    }
}

/// Clears the in-flight flag when the action ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

type StageObserver<'a> = Box<dyn Fn(&Stage) + Send + Sync + 'a>;

/// Wires the summarize actions to their collaborators
pub struct PopupController<'a> {
    credentials: Credentials,
    tabs: &'a dyn TabSource,
    captions: &'a dyn CaptionDownloader,
    summarizer: &'a dyn Summarizer,
    observer: Option<StageObserver<'a>>,
    in_flight: AtomicBool,
}

impl<'a> PopupController<'a> {
    pub fn new(
        credentials: Credentials,
        tabs: &'a dyn TabSource,
        captions: &'a dyn CaptionDownloader,
        summarizer: &'a dyn Summarizer,
    ) -> Self {
        Self {
            credentials,
            tabs,
            captions,
            summarizer,
            observer: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Report stage transitions to `observer`
    pub fn with_observer(mut self, observer: impl Fn(&Stage) + Send + Sync + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run one action to completion. A second call while one is in flight
    /// fails with [`BriefError::Busy`] without touching any collaborator.
    pub async fn run(&self, action: Action) -> Outcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::warn!("Ignoring {:?}: another action is in flight", action);
            return Outcome::Failed(BriefError::Busy);
        };

        let result = match action {
            Action::SummarizePage => self.summarize_page().await,
            Action::SummarizeTranscript => self.summarize_transcript().await,
        };

        result.unwrap_or_else(|err| {
            tracing::debug!("{:?} failed: {}", action, err);
            Outcome::Failed(err)
        })
    }

    fn report(&self, stage: Stage) {
        tracing::debug!("Stage: {:?}", stage);
        if let Some(ref observer) = self.observer {
            observer(&stage);
        }
    }

    /// Trimmed API key and model; the key must not be blank
    fn validated_credentials(&self) -> Result<(&str, &str)> {
        self.report(Stage::Validating);
        let api_key = self.credentials.api_key.trim();
        if api_key.is_empty() {
            return Err(BriefError::MissingCredential);
        }
        let model = self.credentials.model.as_deref().unwrap_or_default().trim();
        Ok((api_key, model))
    }

    async fn summarize_page(&self) -> Result<Outcome> {
        let (api_key, model) = self.validated_credentials()?;

        self.report(Stage::Extracting);
        let tab = self.tabs.active_tab().await?;
        let text = extract_visible_text(tab.as_ref()).await?;
        let text = ensure_usable(text, BriefError::ExtractionTooShort)?;

        self.report(Stage::Summarizing {
            language_code: None,
        });
        let prompt = format!("{}\n\n{}", PAGE_INSTRUCTION, text);
        let summary = self.summarizer.summarize(api_key, model, &prompt).await?;

        Ok(Outcome::PageSummary { summary })
    }

    async fn summarize_transcript(&self) -> Result<Outcome> {
        let (api_key, model) = self.validated_credentials()?;

        self.report(Stage::FetchingTranscript);
        let tab = self.tabs.active_tab().await?;
        let transcript = fetch_transcript(tab.as_ref(), self.captions).await?;

        self.report(Stage::Summarizing {
            language_code: Some(transcript.language_code.clone()),
        });
        let prompt = format!("{}\n\n{}", TRANSCRIPT_INSTRUCTION, transcript.text);
        let summary = self.summarizer.summarize(api_key, model, &prompt).await?;

        Ok(Outcome::TranscriptSummary {
            transcript: transcript.text,
            language_code: transcript.language_code,
            summary,
        })
    }
}
