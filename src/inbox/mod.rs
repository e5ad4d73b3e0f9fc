//! Inbox collaborator: supplies unread messages and marks them read.

pub mod gmail;

pub use gmail::GmailInbox;

use async_trait::async_trait;

use crate::error::InboxError;
use crate::pipeline::types::Message;

/// Mailbox access used by the agent loop. Pure I/O, no decisions.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Fetch up to `max_results` messages matching `query`, in inbox order.
    async fn fetch_unread(&self, max_results: u32, query: &str)
    -> Result<Vec<Message>, InboxError>;

    /// Mark a message as processed so it is not fetched again.
    async fn mark_read(&self, message_id: &str) -> Result<(), InboxError>;
}
