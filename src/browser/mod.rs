mod discovery;
mod launcher;
mod scripting;
mod session;

pub use discovery::{discover_all_browsers, BrowserInfo, BrowserType};
pub use scripting::{CdpTab, TabScripting, TabSource};
pub use session::{PageInfo, SessionManager, SessionStatus};

pub(crate) use session::fetch_ws_url;
