//! Shared types for the message processing pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary shown for a recent item when the judgment carries no description.
pub const NO_SUMMARY: &str = "No summary available";

// ── Inbound message ─────────────────────────────────────────────────

/// Snapshot of an unread inbox message for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Inbox-native message ID.
    pub id: String,
    pub subject: String,
    pub sender: String,
    /// Plain-text body.
    pub body: String,
}

impl Message {
    /// Text handed to the extraction service: subject and body, separated
    /// by a blank line.
    pub fn classification_text(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}

// ── Judgment ────────────────────────────────────────────────────────

/// Primary purpose of a message, as judged by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Meeting,
    Registration,
    Event,
    None,
}

impl Intent {
    /// Whether this intent implies a calendar entry.
    pub fn is_schedulable(self) -> bool {
        matches!(self, Self::Meeting | Self::Registration | Self::Event)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Registration => "Registration",
            Self::Event => "Event",
            Self::None => "None",
        }
    }
}

/// How much a message deserves the user's attention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    #[default]
    Low,
    Medium,
    High,
}

impl Importance {
    /// Medium and High messages are surfaced in the recent-items feed.
    pub fn is_notable(self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

/// Structured event fields for calendar insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub title: String,
    pub start_date_time: DateTime<Utc>,
    /// Never earlier than `start_date_time`.
    pub end_date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
}

/// Classification result for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub intent: Intent,
    /// Free-form label (e.g. "Work", "Social").
    pub category: String,
    pub importance: Importance,
    /// Present only when an event is implied.
    pub event_data: Option<EventData>,
}

impl Judgment {
    /// Neutral judgment used when classification fails: take no action.
    pub fn no_action() -> Self {
        Self {
            intent: Intent::None,
            category: "Unknown".to_string(),
            importance: Importance::Low,
            event_data: None,
        }
    }
}

// ── Bookkeeping ─────────────────────────────────────────────────────

/// Display-oriented record of a notable processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentItem {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub summary: String,
    pub category: String,
    pub importance: Importance,
}

impl RecentItem {
    pub fn from_judgment(message: &Message, judgment: &Judgment) -> Self {
        let summary = judgment
            .event_data
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        Self {
            id: message.id.clone(),
            subject: message.subject.clone(),
            sender: message.sender.clone(),
            summary,
            category: judgment.category.clone(),
            importance: judgment.importance,
        }
    }
}

/// Aggregate counters exposed to the control surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Calendar events created since the process started.
    #[serde(rename = "created_today")]
    pub events_created: u64,
    /// Current length of the recent-items feed.
    pub priority_count: usize,
}
