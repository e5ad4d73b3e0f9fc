//! Lazy construction of the inbox and calendar collaborators.
//!
//! Credentials are read when the agent starts, not when the process
//! boots, so the control surface can come up without them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::calendar::{Calendar, GoogleCalendar};
use crate::config::{CalendarConfig, GmailConfig};
use crate::error::Result;
use crate::inbox::{GmailInbox, Inbox};

/// The I/O collaborators a processing pass needs.
#[derive(Clone)]
pub struct Collaborators {
    pub inbox: Arc<dyn Inbox>,
    pub calendar: Arc<dyn Calendar>,
}

/// Builds collaborators on first start.
#[async_trait]
pub trait CollaboratorFactory: Send + Sync {
    async fn build(&self) -> Result<Collaborators>;
}

/// Builds Gmail + Google Calendar clients from environment variables.
#[derive(Debug, Default)]
pub struct EnvCollaboratorFactory;

#[async_trait]
impl CollaboratorFactory for EnvCollaboratorFactory {
    async fn build(&self) -> Result<Collaborators> {
        info!("Initializing Gmail client");
        let inbox = GmailInbox::new(GmailConfig::from_env()?)?;

        info!("Initializing Calendar client");
        let calendar = GoogleCalendar::new(CalendarConfig::from_env()?)?;

        Ok(Collaborators {
            inbox: Arc::new(inbox),
            calendar: Arc::new(calendar),
        })
    }
}
