use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::session::PageInfo;
use crate::error::{BriefError, Result};

/// Executes a script inside a tab's document and returns its serialized result
#[async_trait]
pub trait TabScripting: Send + Sync {
    /// `expression` is evaluated as-is; wrap zero-argument functions as
    /// `(() => { ... })()`. Promises are awaited.
    async fn execute(&self, expression: &str) -> Result<serde_json::Value>;
}

/// Resolves the single active tab of the focused window
#[async_trait]
pub trait TabSource: Send + Sync {
    async fn active_tab(&self) -> Result<Box<dyn TabScripting>>;
}

/// The active page of a CDP session
#[derive(Debug)]
pub struct CdpTab {
    page: PageInfo,
    ws_url: String,
}

impl CdpTab {
    pub fn new(page: PageInfo) -> Result<Self> {
        let ws_url = page
            .web_socket_debugger_url
            .clone()
            .ok_or_else(|| BriefError::CdpConnectionFailed("No WebSocket URL".to_string()))?;
        Ok(Self { page, ws_url })
    }

    pub fn title(&self) -> &str {
        &self.page.title
    }

    pub fn url(&self) -> &str {
        &self.page.url
    }
}

#[async_trait]
impl TabScripting for CdpTab {
    async fn execute(&self, expression: &str) -> Result<serde_json::Value> {
        let (mut ws, _) = connect_async(self.ws_url.as_str()).await.map_err(|e| {
            BriefError::CdpConnectionFailed(format!("WebSocket connection failed: {}", e))
        })?;

        let cmd = serde_json::json!({
            "id": 1,
            "method": "Runtime.evaluate",
            "params": {
                "expression": expression,
                "returnByValue": true,
                "awaitPromise": true
            }
        });

        ws.send(Message::Text(cmd.to_string().into()))
            .await
            .map_err(|e| BriefError::Other(format!("Failed to send command: {}", e)))?;

        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let response: serde_json::Value = serde_json::from_str(text.as_str())?;
                    if response.get("id") == Some(&serde_json::json!(1)) {
                        return evaluate_response_value(response);
                    }
                }
                Ok(_) => continue,
                Err(e) => return Err(BriefError::Other(format!("WebSocket error: {}", e))),
            }
        }

        Err(BriefError::Other("No response received".to_string()))
    }
}

/// Extract the returned value from a `Runtime.evaluate` reply
fn evaluate_response_value(response: serde_json::Value) -> Result<serde_json::Value> {
    if let Some(error) = response.get("error") {
        return Err(BriefError::JavaScriptError(error.to_string()));
    }

    let result = response.get("result").cloned().unwrap_or_default();

    if let Some(exception) = result.get("exceptionDetails") {
        let msg = exception
            .get("exception")
            .and_then(|e| e.get("description"))
            .or_else(|| exception.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or("JavaScript exception");
        return Err(BriefError::JavaScriptError(msg.to_string()));
    }

    Ok(result
        .get("result")
        .and_then(|r| r.get("value"))
        .cloned()
        .unwrap_or(serde_json::Value::Null))
}
