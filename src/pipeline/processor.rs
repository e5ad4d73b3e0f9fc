//! Message processor: the per-message decision pipeline.
//!
//! For each unread message:
//! 1. Classify subject + body (fail-open to "no action" on error)
//! 2. Medium/High importance → front of the recent-items feed
//! 3. Schedulable intent with event data → create calendar event,
//!    then mark the message read
//! 4. Anything else → leave the message unread
//!
//! One message's failure never aborts the rest of the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::agent::factory::Collaborators;
use crate::agent::state::AgentState;
use crate::error::{ExtractionError, InboxError};
use crate::pipeline::extraction::Extractor;
use crate::pipeline::types::{Judgment, Message, RecentItem};

/// What happened to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Calendar event created; `marked_read` is false if mark-read failed.
    EventCreated { event_id: String, marked_read: bool },
    /// Calendar rejected the event; message stays unread for a later pass.
    CalendarFailed,
    /// Schedulable intent but no usable event data; message stays unread.
    MissingEventData,
    /// Not an event.
    NoAction,
}

impl MessageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "event_created",
            Self::CalendarFailed => "calendar_failed",
            Self::MissingEventData => "missing_event_data",
            Self::NoAction => "no_action",
        }
    }
}

/// Totals for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub fetched: usize,
    pub processed: usize,
    pub events_created: usize,
    /// Messages skipped because a stop was requested mid-batch.
    pub abandoned: usize,
}

/// Runs processing passes against the inbox, extractor and calendar.
pub struct MessageProcessor {
    extractor: Arc<dyn Extractor>,
    collaborators: Collaborators,
    state: Arc<AgentState>,
    extraction_timeout: Duration,
}

impl MessageProcessor {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        collaborators: Collaborators,
        state: Arc<AgentState>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            collaborators,
            state,
            extraction_timeout,
        }
    }

    /// Fetch one batch of unread messages and process them in inbox order.
    ///
    /// Returns early, leaving the rest untouched, once `stop` is set.
    /// Only the fetch itself can fail the pass.
    pub async fn run_pass(
        &self,
        max_results: u32,
        query: &str,
        stop: &AtomicBool,
    ) -> Result<PassSummary, InboxError> {
        info!("Checking for new emails");
        let messages = self.collaborators.inbox.fetch_unread(max_results, query).await?;

        let mut summary = PassSummary {
            fetched: messages.len(),
            ..Default::default()
        };

        if messages.is_empty() {
            debug!("No new emails");
            return Ok(summary);
        }

        info!(count = messages.len(), "Processing unread email(s)");

        for message in &messages {
            if stop.load(Ordering::SeqCst) {
                summary.abandoned = summary.fetched - summary.processed;
                info!(
                    abandoned = summary.abandoned,
                    "Stop requested, abandoning rest of batch"
                );
                break;
            }

            let outcome = self.process(message).await;
            summary.processed += 1;
            if matches!(outcome, MessageOutcome::EventCreated { .. }) {
                summary.events_created += 1;
            }
        }

        info!(
            processed = summary.processed,
            events_created = summary.events_created,
            total = summary.fetched,
            "Pass complete"
        );
        Ok(summary)
    }

    /// Process a single message through the decision pipeline.
    pub async fn process(&self, message: &Message) -> MessageOutcome {
        info!(id = %message.id, subject = %message.subject, "Processing email");

        let judgment = self.judge(message).await;
        info!(
            id = %message.id,
            intent = judgment.intent.label(),
            category = %judgment.category,
            importance = ?judgment.importance,
            "Identified intent"
        );

        if judgment.importance.is_notable() {
            self.state
                .push_recent(RecentItem::from_judgment(message, &judgment))
                .await;
        }

        let outcome = self.act(message, judgment).await;
        debug!(id = %message.id, outcome = outcome.label(), "Email handled");
        outcome
    }

    /// Classify a message. Every failure, including a timeout, falls
    /// back to `Judgment::no_action()` here and nowhere else.
    async fn judge(&self, message: &Message) -> Judgment {
        let text = message.classification_text();
        let result =
            match tokio::time::timeout(self.extraction_timeout, self.extractor.classify(&text))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ExtractionError::Timeout(self.extraction_timeout)),
            };

        result.unwrap_or_else(|e| {
            warn!(id = %message.id, error = %e, "Extraction failed, taking no action");
            Judgment::no_action()
        })
    }

    async fn act(&self, message: &Message, judgment: Judgment) -> MessageOutcome {
        if !judgment.intent.is_schedulable() {
            debug!(id = %message.id, "Skipping email (no event detected)");
            return MessageOutcome::NoAction;
        }

        let Some(event) = judgment.event_data else {
            warn!(
                id = %message.id,
                intent = judgment.intent.label(),
                "Event intent without event data, leaving unread"
            );
            return MessageOutcome::MissingEventData;
        };

        info!(id = %message.id, title = %event.title, "Creating event");
        let created = match self.collaborators.calendar.create_event(&event).await {
            Ok(created) => created,
            Err(e) => {
                error!(id = %message.id, error = %e, "Failed to create event");
                return MessageOutcome::CalendarFailed;
            }
        };

        self.state.record_event_created().await;

        let marked_read = match self.collaborators.inbox.mark_read(&message.id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %message.id, error = %e, "Event created but mark-read failed");
                false
            }
        };

        MessageOutcome::EventCreated {
            event_id: created.id,
            marked_read,
        }
    }
}
