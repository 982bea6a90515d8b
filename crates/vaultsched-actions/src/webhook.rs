//! Webhook action: POST a JSON payload to a URL.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use vaultsched_scheduler::JobAction;

use crate::error::ActionError;

/// Fire-and-acknowledge notification ping. The receiving end decides what the
/// payload means; a 2xx answer is success, anything else is failure.
pub struct WebhookAction {
    http: reqwest::Client,
    url: String,
    payload: Value,
}

impl WebhookAction {
    pub fn new(url: &str, payload: Option<Value>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            payload: payload.unwrap_or_else(|| json!({ "source": "vaultsched" })),
        }
    }

    async fn post(&self) -> Result<(), ActionError> {
        let response = self.http.post(&self.url).json(&self.payload).send().await?;
        if !response.status().is_success() {
            return Err(ActionError::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl JobAction for WebhookAction {
    async fn invoke(&self) -> Result<(), String> {
        self.post().await.map_err(|e| e.to_string())?;
        debug!(url = %self.url, "webhook delivered");
        Ok(())
    }
}
