use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{BriefError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserType {
    Chrome,
    Brave,
    Edge,
    Chromium,
}

impl BrowserType {
    /// Search order when nothing is configured
    const PRIORITY: [BrowserType; 4] = [
        BrowserType::Chrome,
        BrowserType::Brave,
        BrowserType::Edge,
        BrowserType::Chromium,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "Google Chrome",
            BrowserType::Brave => "Brave",
            BrowserType::Edge => "Microsoft Edge",
            BrowserType::Chromium => "Chromium",
        }
    }

    /// Well-known install locations for this platform
    fn install_paths(&self) -> &'static [&'static str] {
        #[cfg(target_os = "macos")]
        {
            match self {
                BrowserType::Chrome => {
                    &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
                }
                BrowserType::Brave => {
                    &["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"]
                }
                BrowserType::Edge => {
                    &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
                }
                BrowserType::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
            }
        }

        #[cfg(target_os = "linux")]
        {
            match self {
                BrowserType::Chrome => &[
                    "/usr/bin/google-chrome",
                    "/usr/bin/google-chrome-stable",
                    "/opt/google/chrome/chrome",
                ],
                BrowserType::Brave => &["/usr/bin/brave-browser", "/usr/bin/brave"],
                BrowserType::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
                BrowserType::Chromium => &[
                    "/usr/bin/chromium",
                    "/usr/bin/chromium-browser",
                    "/snap/bin/chromium",
                ],
            }
        }

        #[cfg(target_os = "windows")]
        {
            match self {
                BrowserType::Chrome => &[
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ],
                BrowserType::Brave => {
                    &[r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe"]
                }
                BrowserType::Edge => {
                    &[r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe"]
                }
                BrowserType::Chromium => &[],
            }
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            &[]
        }
    }

    /// Executable names to look up on PATH
    fn path_binaries(&self) -> &'static [&'static str] {
        match self {
            BrowserType::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            BrowserType::Brave => &["brave-browser", "brave"],
            BrowserType::Edge => &["microsoft-edge", "msedge"],
            BrowserType::Chromium => &["chromium", "chromium-browser"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserInfo {
    pub browser_type: BrowserType,
    pub path: PathBuf,
    pub version: Option<String>,
}

impl BrowserInfo {
    pub fn new(browser_type: BrowserType, path: PathBuf) -> Self {
        Self {
            browser_type,
            path,
            version: None,
        }
    }

    pub fn with_version(mut self) -> Self {
        self.version = detect_version(&self.path);
        self
    }
}

/// Discover the best available browser on the system
pub fn discover_browser() -> Result<BrowserInfo> {
    discover_all_browsers()
        .into_iter()
        .next()
        .ok_or(BriefError::BrowserNotFound)
}

/// Discover all available browsers, one entry per browser type
pub fn discover_all_browsers() -> Vec<BrowserInfo> {
    BrowserType::PRIORITY
        .iter()
        .filter_map(|browser_type| {
            locate(*browser_type).map(|path| BrowserInfo::new(*browser_type, path).with_version())
        })
        .collect()
}

fn locate(browser_type: BrowserType) -> Option<PathBuf> {
    browser_type
        .install_paths()
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            browser_type
                .path_binaries()
                .iter()
                .find_map(|name| which::which(name).ok())
        })
}

/// Parse "Google Chrome 120.0.6099.109" into "120.0.6099.109"
fn parse_version(output: &str) -> Option<String> {
    let output = output.trim();
    if output.is_empty() {
        return None;
    }
    Some(output.rsplit(' ').next().unwrap_or(output).to_string())
}

fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_version(&String::from_utf8_lossy(&output.stdout))
}
