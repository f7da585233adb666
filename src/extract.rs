//! Visible text snapshot of the active tab.

use crate::browser::TabScripting;
use crate::error::{BriefError, Result};

/// Texts shorter than this are not worth summarizing
pub const MIN_TEXT_CHARS: usize = 50;

/// Rendered text of the document body, not its markup
const VISIBLE_TEXT_SCRIPT: &str = "(() => document.body ? document.body.innerText : null)()";

/// Read the tab's visible text. `None` when the document has no body or the
/// script returned something other than a string.
pub async fn extract_visible_text(tab: &dyn TabScripting) -> Result<Option<String>> {
    let value = tab.execute(VISIBLE_TEXT_SCRIPT).await?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

/// Reject absent or too-short text
pub fn ensure_usable(text: Option<String>, too_short: BriefError) -> Result<String> {
    match text {
        Some(text) if text.chars().count() >= MIN_TEXT_CHARS => Ok(text),
        _ => Err(too_short),
    }
}
