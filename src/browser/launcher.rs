use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;

use super::discovery::{discover_browser, BrowserInfo, BrowserType};
use super::session::fetch_ws_url;
use crate::config::BrowserConfig;
use crate::error::{BriefError, Result};

/// Starts a browser with remote debugging enabled
pub struct BrowserLauncher {
    browser_info: BrowserInfo,
    cdp_port: u16,
    headless: bool,
    user_data_dir: PathBuf,
}

impl BrowserLauncher {
    /// Create a launcher from browser configuration
    pub fn from_config(config: &BrowserConfig) -> Result<Self> {
        let browser_info = match config.executable {
            Some(ref exe) => {
                let path = PathBuf::from(shellexpand::tilde(exe).into_owned());
                if !path.exists() {
                    return Err(BriefError::BrowserLaunchFailed(format!(
                        "Browser not found at: {}",
                        path.display()
                    )));
                }
                // Assume Chrome-compatible
                BrowserInfo::new(BrowserType::Chrome, path)
            }
            None => discover_browser()?,
        };

        let user_data_dir = match config.user_data_dir {
            Some(ref dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => default_user_data_dir(),
        };

        Ok(Self {
            browser_info,
            cdp_port: config.cdp_port,
            headless: config.headless,
            user_data_dir,
        })
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.cdp_port),
            format!("--user-data-dir={}", self.user_data_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];

        if self.headless {
            args.push("--headless=new".to_string());
        }

        args
    }

    /// Spawn the browser process
    pub fn launch(&self) -> Result<Child> {
        std::fs::create_dir_all(&self.user_data_dir)?;

        let args = self.build_args();
        tracing::debug!(
            "Launching browser: {:?} with args: {:?}",
            self.browser_info.path,
            args
        );

        Command::new(&self.browser_info.path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BriefError::BrowserLaunchFailed(format!(
                    "Failed to launch {}: {}",
                    self.browser_info.browser_type.name(),
                    e
                ))
            })
    }

    /// Spawn the browser and wait until its CDP endpoint answers
    pub async fn launch_and_wait(&self) -> Result<(Child, String)> {
        let child = self.launch()?;
        let cdp_url = self.wait_for_cdp().await?;
        Ok((child, cdp_url))
    }

    async fn wait_for_cdp(&self) -> Result<String> {
        // Up to 10 seconds
        for attempt in 1..=20 {
            sleep(Duration::from_millis(500)).await;

            match fetch_ws_url(self.cdp_port).await {
                Some(ws_url) => {
                    tracing::info!("CDP ready at: {}", ws_url);
                    return Ok(ws_url);
                }
                None => tracing::debug!("CDP not ready yet (attempt {})", attempt),
            }
        }

        Err(BriefError::Timeout(
            "Timeout waiting for CDP to be ready".to_string(),
        ))
    }

    pub fn browser_info(&self) -> &BrowserInfo {
        &self.browser_info
    }

    pub fn cdp_port(&self) -> u16 {
        self.cdp_port
    }
}

fn default_user_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabbrief")
        .join("browser-profile")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(headless: bool) -> BrowserLauncher {
        BrowserLauncher {
            browser_info: BrowserInfo::new(BrowserType::Chromium, PathBuf::from("/bin/chromium")),
            cdp_port: 9333,
            headless,
            user_data_dir: PathBuf::from("/tmp/tabbrief-profile"),
        }
    }

    #[test]
    fn args_enable_remote_debugging() {
        let args = launcher(false).build_args();

        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/tabbrief-profile".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn headless_adds_flag() {
        let args = launcher(true).build_args();
        assert!(args.contains(&"--headless=new".to_string()));
    }

    #[test]
    fn missing_executable_fails() {
        let config = BrowserConfig {
            executable: Some("/definitely/not/a/browser".to_string()),
            ..BrowserConfig::default()
        };

        assert!(matches!(
            BrowserLauncher::from_config(&config),
            Err(BriefError::BrowserLaunchFailed(_))
        ));
    }
}
