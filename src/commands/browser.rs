use std::time::Duration;

use colored::Colorize;
use futures::StreamExt;
use tokio::time::timeout;

use crate::browser::{discover_all_browsers, fetch_ws_url, SessionManager, SessionStatus};
use crate::cli::{BrowserCommands, Cli};
use crate::config::{Config, Credentials, FileSettingsStore};
use crate::error::{BriefError, Result};

pub async fn run(cli: &Cli, command: &BrowserCommands) -> Result<()> {
    let config = cli.effective_config()?;

    match command {
        BrowserCommands::Status => status(cli, &config).await,
        BrowserCommands::Open { url } => open(cli, &config, url).await,
        BrowserCommands::Pages => pages(cli, &config).await,
        BrowserCommands::Connect { endpoint } => connect(cli, &config, endpoint).await,
        BrowserCommands::Close => close(cli, &config).await,
    }
}

/// Resolve a port number or ws:// URL into a (port, ws_url) pair
async fn resolve_cdp_endpoint(endpoint: &str) -> Result<(u16, String)> {
    let endpoint = endpoint.trim();

    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        let port = port_from_ws_url(endpoint).unwrap_or(9222);
        return Ok((port, endpoint.to_string()));
    }

    let port: u16 = endpoint.parse().map_err(|_| {
        BriefError::CdpConnectionFailed(
            "Invalid endpoint. Use a port number or WebSocket URL (ws://...).".to_string(),
        )
    })?;

    let ws_url = fetch_ws_url(port).await.ok_or_else(|| {
        BriefError::CdpConnectionFailed(format!(
            "Cannot reach CDP at port {}. Is the browser running with --remote-debugging-port={}?",
            port, port
        ))
    })?;

    Ok((port, ws_url))
}

fn port_from_ws_url(url: &str) -> Option<u16> {
    let authority = url.split("://").nth(1)?.split('/').next()?;
    authority.rsplit_once(':')?.1.parse().ok()
}

fn normalize_navigation_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(BriefError::Other("Invalid URL: empty input".to_string()));
    }

    if let Some(rest) = trimmed.strip_prefix("//") {
        return Ok(format!("https://{}", rest));
    }

    // `localhost:3000` looks like a scheme but is a host
    if trimmed.contains("://") || (has_explicit_scheme(trimmed) && !is_host_with_port(trimmed)) {
        return Ok(trimmed.to_string());
    }

    Ok(format!("https://{}", trimmed))
}

fn is_host_with_port(input: &str) -> bool {
    let end = input.find(['/', '?', '#']).unwrap_or(input.len());
    match input[..end].rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn has_explicit_scheme(input: &str) -> bool {
    let Some(colon) = input.find(':') else {
        return false;
    };
    let scheme = &input[..colon];
    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

async fn status(cli: &Cli, config: &Config) -> Result<()> {
    let api_key = Credentials::load(&FileSettingsStore::default_location())?
        .with_overrides(cli.api_key.as_deref(), None)
        .api_key;
    let browsers = discover_all_browsers();
    let session_manager = SessionManager::new(config.clone());
    let session = session_manager.get_status().await;

    if cli.json {
        let session_json = match &session {
            SessionStatus::Running { cdp_port, cdp_url } => {
                serde_json::json!({ "state": "running", "cdp_port": cdp_port, "cdp_url": cdp_url })
            }
            SessionStatus::Stale { cdp_port } => {
                serde_json::json!({ "state": "stale", "cdp_port": cdp_port })
            }
            SessionStatus::NotRunning => serde_json::json!({ "state": "not_running" }),
        };
        let browsers_json: Vec<_> = browsers
            .iter()
            .map(|b| {
                serde_json::json!({
                    "name": b.browser_type.name(),
                    "path": b.path.display().to_string(),
                    "version": b.version,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "api_key_configured": !api_key.trim().is_empty(),
                "browsers": browsers_json,
                "session": session_json,
            }))?
        );
        return Ok(());
    }

    println!("{}", "API Key:".bold());
    if api_key.trim().is_empty() {
        println!(
            "  {} Not configured (set via --api-key, TABBRIEF_API_KEY or 'tabbrief config set apiKeyValue <key>')",
            "○".dimmed()
        );
    } else {
        println!(
            "  {} Configured ({})",
            "✓".green(),
            mask_key(api_key.trim()).dimmed()
        );
    }
    println!();

    println!("{}", "Detected Browsers:".bold());
    if browsers.is_empty() {
        println!("  {} No browsers found", "!".yellow());
    } else {
        for browser in &browsers {
            println!(
                "  {} {} {}",
                "✓".green(),
                browser.browser_type.name(),
                browser
                    .version
                    .as_ref()
                    .map(|v| format!("(v{})", v))
                    .unwrap_or_default()
                    .dimmed()
            );
            println!("    {}", browser.path.display().to_string().dimmed());
        }
    }
    println!();

    println!("{}", "Session Status:".bold());
    match session {
        SessionStatus::Running { cdp_port, cdp_url } => {
            println!("  {} CDP Port: {}", "✓".green(), cdp_port);
            println!("  {} CDP URL: {}", "✓".green(), cdp_url.dimmed());

            if let Ok(pages) = session_manager.get_pages().await {
                println!();
                println!("{}", "Open Pages:".bold());
                for (i, page) in pages.iter().enumerate() {
                    let marker = if i == 0 { " (active)" } else { "" };
                    println!(
                        "  {}. {}{}",
                        (i + 1).to_string().cyan(),
                        page.title.bold(),
                        marker.dimmed()
                    );
                    println!("     {}", page.url.dimmed());
                }
            }
        }
        SessionStatus::Stale { cdp_port } => {
            println!(
                "  {} Port {} (stale session)",
                "!".yellow(),
                cdp_port.to_string().cyan()
            );
        }
        SessionStatus::NotRunning => {
            println!("  {} Not running", "○".dimmed());
        }
    }

    Ok(())
}

async fn open(cli: &Cli, config: &Config, url: &str) -> Result<()> {
    let normalized_url = normalize_navigation_url(url)?;

    let session_manager = SessionManager::new(config.clone());
    let (browser, mut handler) = session_manager.get_or_create_session().await?;

    tokio::spawn(async move { while handler.next().await.is_some() {} });

    let page = match timeout(Duration::from_secs(30), browser.new_page(normalized_url.as_str())).await
    {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => return Err(BriefError::Other(format!("Failed to open page: {}", e))),
        Err(_) => {
            return Err(BriefError::Timeout(format!(
                "Page load timed out after 30 seconds: {}",
                normalized_url
            )))
        }
    };

    let _ = timeout(Duration::from_secs(30), page.wait_for_navigation()).await;

    let title = match timeout(Duration::from_secs(5), page.get_title()).await {
        Ok(Ok(Some(t))) => t,
        _ => String::new(),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "success": true,
                "url": normalized_url,
                "title": title
            })
        );
    } else {
        println!("{} {}", "✓".green(), title.bold());
        println!("  {}", normalized_url.dimmed());
    }

    Ok(())
}

async fn pages(cli: &Cli, config: &Config) -> Result<()> {
    let session_manager = SessionManager::new(config.clone());
    let pages = session_manager.get_pages().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
    } else if pages.is_empty() {
        println!("{} No pages open", "!".yellow());
    } else {
        println!("{} {} pages open\n", "✓".green(), pages.len());
        for (i, page) in pages.iter().enumerate() {
            println!(
                "{}. {} {}",
                (i + 1).to_string().cyan(),
                page.title.bold(),
                format!("({})", &page.id[..8.min(page.id.len())]).dimmed()
            );
            println!("   {}", page.url.dimmed());
        }
    }

    Ok(())
}

async fn connect(cli: &Cli, config: &Config, endpoint: &str) -> Result<()> {
    let (cdp_port, cdp_url) = resolve_cdp_endpoint(endpoint).await?;

    let session_manager = SessionManager::new(config.clone());
    session_manager.save_external_session(cdp_port, &cdp_url)?;
    tracing::debug!("Recorded external browser on port {}", cdp_port);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "success": true,
                "cdp_port": cdp_port,
                "cdp_url": cdp_url
            })
        );
    } else {
        println!("{} Connected to CDP at port {}", "✓".green(), cdp_port);
        println!("  WebSocket URL: {}", cdp_url);
    }

    Ok(())
}

async fn close(cli: &Cli, config: &Config) -> Result<()> {
    let session_manager = SessionManager::new(config.clone());
    session_manager.close_session().await?;

    if cli.json {
        println!("{}", serde_json::json!({ "success": true }));
    } else {
        println!("{} Browser closed", "✓".green());
    }

    Ok(())
}
