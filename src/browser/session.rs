use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::launcher::BrowserLauncher;
use super::scripting::{CdpTab, TabScripting, TabSource};
use crate::config::Config;
use crate::error::{BriefError, Result};

/// Page info from CDP /json/list endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub web_socket_debugger_url: Option<String>,
}

/// Session state persisted to disk
#[derive(Debug, Serialize, Deserialize)]
struct SessionState {
    cdp_port: u16,
    pid: Option<u32>,
    cdp_url: String,
}

#[derive(Debug)]
pub enum SessionStatus {
    Running { cdp_port: u16, cdp_url: String },
    Stale { cdp_port: u16 },
    NotRunning,
}

fn local_client(timeout: Option<Duration>) -> reqwest::Client {
    // Bypass proxies for localhost
    let mut builder = reqwest::Client::builder().no_proxy();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

/// Browser WebSocket URL from `/json/version`, `None` when unreachable
pub(crate) async fn fetch_ws_url(cdp_port: u16) -> Option<String> {
    let url = format!("http://127.0.0.1:{}/json/version", cdp_port);
    let resp = local_client(Some(Duration::from_secs(5)))
        .get(&url)
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let info: serde_json::Value = resp.json().await.ok()?;
    info.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Manages the browser session across CLI invocations
pub struct SessionManager {
    config: Config,
    session_file: PathBuf,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        let session_file = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tabbrief")
            .join("session.json");

        Self {
            config,
            session_file,
        }
    }

    fn load_session_state(&self) -> Option<SessionState> {
        let content = fs::read_to_string(&self.session_file).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn save_session_state(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.session_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.session_file, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    fn remove_session_state(&self) -> Result<()> {
        if self.session_file.exists() {
            fs::remove_file(&self.session_file)?;
        }
        Ok(())
    }

    /// Port of the recorded session, or the configured port
    fn cdp_port(&self) -> u16 {
        self.load_session_state()
            .map(|s| s.cdp_port)
            .unwrap_or(self.config.browser.cdp_port)
    }

    /// Record a browser started outside of tabbrief
    pub fn save_external_session(&self, cdp_port: u16, cdp_url: &str) -> Result<()> {
        self.save_session_state(&SessionState {
            cdp_port,
            pid: None,
            cdp_url: cdp_url.to_string(),
        })
    }

    /// Reuse the live session or launch a new browser
    pub async fn get_or_create_session(&self) -> Result<(Browser, Handler)> {
        if let Some(mut state) = self.load_session_state() {
            if let Some(fresh_url) = fetch_ws_url(state.cdp_port).await {
                // The browser may have restarted on the same port
                if fresh_url != state.cdp_url {
                    tracing::debug!("CDP WebSocket URL changed, updating session");
                    state.cdp_url = fresh_url;
                    self.save_session_state(&state)?;
                }
                tracing::debug!("Reusing existing session on port {}", state.cdp_port);
                return self.connect_to_session(&state).await;
            }
            tracing::debug!("Session on port {} is dead, removing", state.cdp_port);
            self.remove_session_state()?;
        }

        // A browser may already be listening on the configured port
        let port = self.config.browser.cdp_port;
        if let Some(cdp_url) = fetch_ws_url(port).await {
            tracing::debug!("Adopting browser already listening on port {}", port);
            self.save_external_session(port, &cdp_url)?;
            return Browser::connect(&cdp_url).await.map_err(|e| {
                BriefError::CdpConnectionFailed(format!("Failed to connect to browser: {}", e))
            });
        }

        self.create_session().await
    }

    async fn create_session(&self) -> Result<(Browser, Handler)> {
        let launcher = BrowserLauncher::from_config(&self.config.browser)?;
        tracing::info!(
            "Launching {} on CDP port {}",
            launcher.browser_info().browser_type.name(),
            launcher.cdp_port()
        );

        let (child, cdp_url) = launcher.launch_and_wait().await?;

        let state = SessionState {
            cdp_port: launcher.cdp_port(),
            pid: Some(child.id()),
            cdp_url,
        };
        self.save_session_state(&state)?;

        self.connect_to_session(&state).await
    }

    async fn connect_to_session(&self, state: &SessionState) -> Result<(Browser, Handler)> {
        Browser::connect(&state.cdp_url).await.map_err(|e| {
            BriefError::CdpConnectionFailed(format!("Failed to connect to browser: {}", e))
        })
    }

    /// Close the recorded browser and forget the session
    pub async fn close_session(&self) -> Result<()> {
        if let Some(state) = self.load_session_state() {
            if let Ok((mut browser, mut handler)) = self.connect_to_session(&state).await {
                tokio::spawn(async move { while handler.next().await.is_some() {} });
                let _ = browser.close().await;
            }
            self.remove_session_state()?;
        }
        Ok(())
    }

    /// List page targets, most recently focused first
    pub async fn get_pages(&self) -> Result<Vec<PageInfo>> {
        let url = format!("http://127.0.0.1:{}/json/list", self.cdp_port());

        let response = local_client(Some(Duration::from_secs(5)))
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("CDP list request failed: {}", e);
                BriefError::BrowserNotRunning
            })?;

        let pages: Vec<PageInfo> = response.json().await.map_err(|e| {
            BriefError::CdpConnectionFailed(format!("Failed to parse pages: {}", e))
        })?;

        // Only actual pages (not extensions, service workers, etc.)
        Ok(pages
            .into_iter()
            .filter(|p| p.page_type == "page")
            .collect())
    }

    /// The single active tab: Chrome lists the last focused page first
    pub async fn resolve_active_tab(&self) -> Result<CdpTab> {
        let page = self
            .get_pages()
            .await?
            .into_iter()
            .next()
            .ok_or(BriefError::BrowserNotRunning)?;
        tracing::debug!("Active tab: {} ({})", page.title, page.url);
        CdpTab::new(page)
    }

    /// Browser status for the recorded session
    pub async fn get_status(&self) -> SessionStatus {
        match self.load_session_state() {
            Some(state) => match fetch_ws_url(state.cdp_port).await {
                Some(cdp_url) => SessionStatus::Running {
                    cdp_port: state.cdp_port,
                    cdp_url,
                },
                None => SessionStatus::Stale {
                    cdp_port: state.cdp_port,
                },
            },
            None => SessionStatus::NotRunning,
        }
    }
}

#[async_trait::async_trait]
impl TabSource for SessionManager {
    async fn active_tab(&self) -> Result<Box<dyn TabScripting>> {
        Ok(Box::new(self.resolve_active_tab().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session_manager(dir: &std::path::Path) -> SessionManager {
        SessionManager {
            config: Config::default(),
            session_file: dir.join("session.json"),
        }
    }

    #[test]
    fn save_and_load_external_session() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());

        sm.save_external_session(9222, "ws://127.0.0.1:9222/devtools/browser/abc")
            .unwrap();

        let state = sm.load_session_state().unwrap();
        assert_eq!(state.cdp_port, 9222);
        assert_eq!(state.cdp_url, "ws://127.0.0.1:9222/devtools/browser/abc");
        assert!(state.pid.is_none());
    }

    #[test]
    fn save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sm = SessionManager {
            config: Config::default(),
            session_file: dir.path().join("nested").join("session.json"),
        };

        sm.save_external_session(9222, "ws://localhost:9222").unwrap();
        assert!(dir.path().join("nested").join("session.json").exists());
    }

    #[test]
    fn remove_missing_session_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());

        sm.remove_session_state().unwrap();
        assert!(sm.load_session_state().is_none());
    }

    #[test]
    fn recorded_port_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());
        assert_eq!(sm.cdp_port(), 9222);

        sm.save_external_session(9444, "ws://127.0.0.1:9444").unwrap();
        assert_eq!(sm.cdp_port(), 9444);
    }

    #[test]
    fn page_info_parses_cdp_list_entry() {
        let raw = r#"{
            "description": "",
            "id": "0F1E",
            "title": "Example",
            "type": "page",
            "url": "https://example.com/",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/0F1E"
        }"#;
        let page: PageInfo = serde_json::from_str(raw).unwrap();

        assert_eq!(page.page_type, "page");
        assert_eq!(
            page.web_socket_debugger_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/0F1E")
        );
    }

    #[tokio::test]
    async fn dead_session_reports_stale() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());

        sm.save_external_session(19999, "ws://127.0.0.1:19999").unwrap();

        assert!(matches!(
            sm.get_status().await,
            SessionStatus::Stale { cdp_port: 19999 }
        ));
    }

    #[tokio::test]
    async fn no_session_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());

        assert!(matches!(sm.get_status().await, SessionStatus::NotRunning));
    }

    #[tokio::test]
    async fn active_tab_without_browser_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let sm = test_session_manager(dir.path());
        sm.save_external_session(19998, "ws://127.0.0.1:19998").unwrap();

        assert!(matches!(
            sm.resolve_active_tab().await,
            Err(BriefError::BrowserNotRunning)
        ));
    }

    #[tokio::test]
    async fn fetch_ws_url_returns_none_for_unreachable_port() {
        assert!(fetch_ws_url(19997).await.is_none());
    }
}
