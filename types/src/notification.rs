//! Ephemeral notification value types.
//!
//! Notifications are client-only and never persisted. The store that owns
//! their lifecycle lives in `lootsync-core`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    /// Icon used when the caller doesn't pick one.
    pub fn default_icon(&self) -> &'static str {
        match self {
            Self::Success => "emoji_events",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notif-{}", self.0)
    }
}

/// What a feature hands to the store. Id and timestamp are assigned on enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub icon: Option<String>,
}

impl NotificationDraft {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            icon: None,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A notification as rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_draft(id: NotificationId, draft: NotificationDraft, created_at: DateTime<Utc>) -> Self {
        let icon = draft
            .icon
            .unwrap_or_else(|| draft.severity.default_icon().to_string());
        Self {
            id,
            severity: draft.severity,
            title: draft.title,
            message: draft.message,
            icon,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DismissReason {
    Manual,
    Expired,
}

/// Lifecycle of one notification: `Pending -> Visible -> Dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationState {
    Pending,
    Visible,
    Dismissed(DismissReason),
}

impl NotificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dismissed(_))
    }
}
