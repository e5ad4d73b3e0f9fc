//! Calendar collaborator: turns extracted event data into calendar entries.

pub mod google;

pub use google::GoogleCalendar;

use async_trait::async_trait;

use crate::error::CalendarError;
use crate::pipeline::types::EventData;

/// Handle to an event the calendar accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: String,
    /// Browser link to the event, when the provider returns one.
    pub html_link: Option<String>,
}

#[async_trait]
pub trait Calendar: Send + Sync {
    async fn create_event(&self, event: &EventData) -> Result<CreatedEvent, CalendarError>;
}
