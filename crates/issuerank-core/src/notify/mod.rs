//! Push notification boundary.
//!
//! The core only decides whether to notify and what to say; delivery is the
//! dispatcher's job and is never retried here.

mod fcm;

pub use fcm::FcmDispatcher;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::model::Problem;
use crate::storage::NotificationsConfig;

/// A message addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub click_action: String,
}

/// What the dispatcher reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Accepted by the delivery service.
    Delivered { message_id: Option<String> },
    /// Recorded locally without contacting any service.
    Logged,
}

/// Every delivery backend implements this trait.
pub trait NotificationDispatcher: Send + Sync {
    /// Short backend identifier for logs (e.g. "fcm", "log").
    fn name(&self) -> &str;

    fn send(
        &self,
        device_token: &str,
        notification: &Notification,
    ) -> Result<DeliveryOutcome, DispatchError>;
}

/// Builds the status-change message for a problem's reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    pub title: String,
    pub click_action: String,
}

impl Default for StatusNotice {
    fn default() -> Self {
        Self {
            title: "Problem Status Updated".into(),
            click_action: "FLUTTER_NOTIFICATION_CLICK".into(),
        }
    }
}

impl StatusNotice {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            title: config.title.clone(),
            click_action: config.click_action.clone(),
        }
    }

    pub fn render(&self, problem: &Problem) -> Notification {
        Notification {
            title: self.title.clone(),
            body: format!("Your report \"{}\" is now {}.", problem.title, problem.status),
            click_action: self.click_action.clone(),
        }
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn name(&self) -> &str {
        "log"
    }

    fn send(
        &self,
        device_token: &str,
        notification: &Notification,
    ) -> Result<DeliveryOutcome, DispatchError> {
        tracing::info!(
            device = %redact(device_token),
            title = %notification.title,
            body = %notification.body,
            "notification not delivered (log dispatcher)"
        );
        Ok(DeliveryOutcome::Logged)
    }
}

/// Pick the dispatcher the configuration asks for.
///
/// Falls back to [`LogDispatcher`] when notifications are disabled or no
/// server key is configured.
pub fn dispatcher_from_config(
    config: &NotificationsConfig,
) -> Result<Box<dyn NotificationDispatcher>, DispatchError> {
    if !config.enabled || config.server_key.trim().is_empty() {
        return Ok(Box::new(LogDispatcher));
    }
    Ok(Box::new(FcmDispatcher::from_config(config)?))
}

/// Device handles are credentials; only the tail goes into logs.
pub(crate) fn redact(token: &str) -> String {
    let tail = token
        .char_indices()
        .rev()
        .nth(5)
        .map_or(token, |(i, _)| &token[i..]);
    format!("…{tail}")
}
