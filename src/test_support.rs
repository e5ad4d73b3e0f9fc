//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::calendar::{Calendar, CreatedEvent};
use crate::error::{CalendarError, ExtractionError, InboxError};
use crate::inbox::Inbox;
use crate::pipeline::extraction::Extractor;
use crate::pipeline::types::{EventData, Importance, Intent, Judgment, Message};

pub fn message(id: &str, subject: &str) -> Message {
    Message {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: "Alice <alice@example.com>".to_string(),
        body: format!("Details about {subject}"),
    }
}

pub fn event_data(title: &str) -> EventData {
    EventData {
        title: title.to_string(),
        start_date_time: Utc.with_ymd_and_hms(2025, 11, 21, 10, 0, 0).unwrap(),
        end_date_time: Utc.with_ymd_and_hms(2025, 11, 21, 11, 0, 0).unwrap(),
        location: Some("Virtual".to_string()),
        description: Some(format!("Agenda for {title}")),
        attendees: vec![],
    }
}

pub fn judgment(intent: Intent, importance: Importance, event: Option<EventData>) -> Judgment {
    Judgment {
        intent,
        category: "Work".to_string(),
        importance,
        event_data: event,
    }
}

/// Inbox over a fixed message list; read messages drop out of later fetches.
pub struct MockInbox {
    messages: Mutex<Vec<Message>>,
    marked: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_mark_read: AtomicBool,
}

impl MockInbox {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: Mutex::new(messages),
            marked: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_mark_read: AtomicBool::new(false),
        }
    }

    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fail_mark_read(&self) {
        self.fail_mark_read.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Inbox for MockInbox {
    async fn fetch_unread(
        &self,
        max_results: u32,
        _query: &str,
    ) -> Result<Vec<Message>, InboxError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(InboxError::InvalidResponse("mock fetch failure".into()));
        }
        let marked = self.marked.lock().unwrap().clone();
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !marked.contains(&m.id))
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), InboxError> {
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(InboxError::Api {
                status: 500,
                body: "mock mark-read failure".into(),
            });
        }
        self.marked.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

/// Calendar that records events and rejects configured titles.
#[derive(Default)]
pub struct MockCalendar {
    created: Mutex<Vec<EventData>>,
    fail_title: Option<String>,
    raise_on_create: Option<Arc<AtomicBool>>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(title: &str) -> Self {
        Self {
            fail_title: Some(title.to_string()),
            ..Self::default()
        }
    }

    /// Sets `flag` every time an event is created.
    pub fn raising_on_create(flag: Arc<AtomicBool>) -> Self {
        Self {
            raise_on_create: Some(flag),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<EventData> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl Calendar for MockCalendar {
    async fn create_event(&self, event: &EventData) -> Result<CreatedEvent, CalendarError> {
        if self.fail_title.as_deref() == Some(event.title.as_str()) {
            return Err(CalendarError::Api {
                status: 403,
                body: "mock calendar failure".into(),
            });
        }
        if let Some(flag) = &self.raise_on_create {
            flag.store(true, Ordering::SeqCst);
        }
        let mut created = self.created.lock().unwrap();
        created.push(event.clone());
        Ok(CreatedEvent {
            id: format!("ev{}", created.len()),
            html_link: None,
        })
    }
}

/// Extractor that answers by subject line; unknown subjects fail.
#[derive(Default)]
pub struct ScriptedExtractor {
    by_subject: HashMap<String, Judgment>,
    delay: Option<Duration>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, subject: &str, judgment: Judgment) -> Self {
        self.by_subject.insert(subject.to_string(), judgment);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn classify(&self, text: &str) -> Result<Judgment, ExtractionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let subject = text
            .strip_prefix("Subject: ")
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap_or_default();
        self.by_subject
            .get(subject)
            .cloned()
            .ok_or_else(|| ExtractionError::InvalidResponse(format!("no script for '{subject}'")))
    }
}
