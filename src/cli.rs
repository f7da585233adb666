use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands;
use crate::config::Config;
use crate::error::Result;
use crate::popup::Action;

/// tabbrief - Summarize the active browser tab or a YouTube transcript
#[derive(Parser)]
#[command(name = "tabbrief")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Groq API key (overrides the stored key)
    #[arg(long, env = "TABBRIEF_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier (overrides the stored model)
    #[arg(long, env = "TABBRIEF_MODEL", global = true)]
    pub model: Option<String>,

    /// Remote debugging port of the browser
    #[arg(long, env = "TABBRIEF_CDP_PORT", global = true)]
    pub cdp_port: Option<u16>,

    /// Browser executable path (overrides auto-discovery)
    #[arg(long, env = "TABBRIEF_BROWSER_PATH", global = true)]
    pub browser_path: Option<String>,

    /// Launch the browser headless
    #[arg(long, env = "TABBRIEF_HEADLESS", global = true)]
    pub headless: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the text of the active tab
    Page,

    /// Summarize the captions of the YouTube video in the active tab
    Transcript,

    /// Browser session commands
    Browser {
        #[command(subcommand)]
        command: BrowserCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum BrowserCommands {
    /// Show browser status and detection results
    Status,

    /// Open a URL in a new tab
    Open {
        /// URL to open
        url: String,
    },

    /// List all open pages/tabs
    Pages,

    /// Connect to an existing browser
    Connect {
        /// CDP endpoint (port or WebSocket URL)
        endpoint: String,
    },

    /// Close the browser
    Close,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. groq.api_key, apiKeyValue, browser.cdp_port)
        key: String,
        /// Configuration value (empty to clear)
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Delete the configuration file
    Reset,
}

impl Cli {
    pub async fn run(&self) -> Result<ExitCode> {
        match &self.command {
            Commands::Page => commands::summarize::run(self, Action::SummarizePage).await,
            Commands::Transcript => {
                commands::summarize::run(self, Action::SummarizeTranscript).await
            }
            Commands::Browser { command } => {
                commands::browser::run(self, command).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Config { command } => {
                commands::config::run(self, command).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    /// Stored configuration with the global flags applied on top
    pub fn effective_config(&self) -> Result<Config> {
        let mut config = Config::load()?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.cdp_port {
            config.browser.cdp_port = port;
        }
        if let Some(ref path) = self.browser_path {
            config.browser.executable = Some(path.clone());
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}
