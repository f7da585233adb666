use std::process::ExitCode;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::GroqClient;
use crate::browser::SessionManager;
use crate::cli::Cli;
use crate::config::{Credentials, FileSettingsStore};
use crate::error::Result;
use crate::popup::{Action, Outcome, PopupController};
use crate::transcript::HttpCaptionDownloader;

/// Spinner on stderr, `None` in json mode
fn create_spinner(json: bool) -> Option<ProgressBar> {
    if json {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("  {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

pub async fn run(cli: &Cli, action: Action) -> Result<ExitCode> {
    let config = cli.effective_config()?;

    let credentials = Credentials::load(&FileSettingsStore::default_location())?
        .with_overrides(cli.api_key.as_deref(), cli.model.as_deref());

    let tabs = SessionManager::new(config.clone());
    let captions = HttpCaptionDownloader::from_config(&config)?;
    let summarizer = GroqClient::from_config(&config)?;

    let spinner = create_spinner(cli.json);
    let mut controller = PopupController::new(credentials, &tabs, &captions, &summarizer);
    if let Some(ref pb) = spinner {
        controller = controller.with_observer(move |stage| pb.set_message(stage.message()));
    }

    let outcome = controller.run(action).await;
    drop(controller);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(action, &outcome))?);
    } else if outcome.is_success() {
        println!("{}", outcome.render());
    } else {
        eprintln!("{}", outcome.render().red());
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn outcome_json(action: Action, outcome: &Outcome) -> serde_json::Value {
    let action = match action {
        Action::SummarizePage => "page",
        Action::SummarizeTranscript => "transcript",
    };

    match outcome {
        Outcome::PageSummary { summary } => serde_json::json!({
            "success": true,
            "action": action,
            "summary": summary,
        }),
        Outcome::TranscriptSummary {
            transcript,
            language_code,
            summary,
        } => serde_json::json!({
            "success": true,
            "action": action,
            "language_code": language_code,
            "transcript": transcript,
            "summary": summary,
        }),
        Outcome::Failed(err) => serde_json::json!({
            "success": false,
            "action": action,
            "error": err.to_string(),
            "output": outcome.render(),
        }),
    }
}
