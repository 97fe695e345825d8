//! Firebase Cloud Messaging delivery over the legacy HTTP API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{redact, DeliveryOutcome, Notification, NotificationDispatcher};
use crate::error::DispatchError;
use crate::storage::NotificationsConfig;

pub struct FcmDispatcher {
    client: Client,
    endpoint: Url,
    server_key: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<SendResult>,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    message_id: Option<String>,
    error: Option<String>,
}

impl FcmDispatcher {
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL, the key is empty,
    /// or the HTTP client cannot be built.
    pub fn new(endpoint: &str, server_key: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| DispatchError::NotConfigured(format!("invalid endpoint '{endpoint}': {e}")))?;
        if server_key.trim().is_empty() {
            return Err(DispatchError::NotConfigured("FCM server key is empty".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            server_key: server_key.to_string(),
        })
    }

    pub fn from_config(config: &NotificationsConfig) -> Result<Self, DispatchError> {
        Self::new(
            &config.endpoint,
            &config.server_key,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }
}

impl NotificationDispatcher for FcmDispatcher {
    fn name(&self) -> &str {
        "fcm"
    }

    fn send(
        &self,
        device_token: &str,
        notification: &Notification,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let body = json!({
            "to": device_token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
                "click_action": notification.click_action,
            }
        });

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: SendResponse = resp
            .json()
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        let first = parsed.results.into_iter().next();

        if parsed.failure > 0 {
            let reason = first
                .and_then(|r| r.error)
                .unwrap_or_else(|| "unknown error".into());
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message: reason,
            });
        }

        let message_id = first.and_then(|r| r.message_id);
        tracing::debug!(device = %redact(device_token), ?message_id, "notification delivered");
        Ok(DeliveryOutcome::Delivered { message_id })
    }
}
