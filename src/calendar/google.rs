//! Google Calendar API v3 client.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::info;

use super::{Calendar, CreatedEvent};
use crate::config::CalendarConfig;
use crate::error::CalendarError;
use crate::pipeline::types::EventData;

pub struct GoogleCalendar {
    config: CalendarConfig,
    events_url: Url,
    http: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        let events_url = events_url(&config.api_base, &config.calendar_id)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            config,
            events_url,
            http,
        })
    }
}

#[async_trait]
impl Calendar for GoogleCalendar {
    async fn create_event(&self, event: &EventData) -> Result<CreatedEvent, CalendarError> {
        let body = build_event_body(event, &self.config.time_zone);

        let response = self
            .http
            .post(self.events_url.clone())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let created: Value = response.json().await?;
        let created = parse_created(&created)?;
        info!(
            event_id = %created.id,
            link = created.html_link.as_deref().unwrap_or("-"),
            "Calendar event created"
        );
        Ok(created)
    }
}

/// `{api_base}/calendars/{calendar_id}/events`, with the id percent-encoded
/// as a single path segment.
fn events_url(api_base: &str, calendar_id: &str) -> Result<Url, CalendarError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| CalendarError::InvalidUrl(format!("{api_base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| CalendarError::InvalidUrl(api_base.to_string()))?
        .pop_if_empty()
        .extend(["calendars", calendar_id, "events"]);
    Ok(url)
}

/// Build the events.insert request body.
fn build_event_body(event: &EventData, time_zone: &str) -> Value {
    let title = if event.title.trim().is_empty() {
        "New Event"
    } else {
        event.title.as_str()
    };

    json!({
        "summary": title,
        "location": event.location.as_deref().unwrap_or(""),
        "description": event.description.as_deref().unwrap_or(""),
        "start": {
            "dateTime": event.start_date_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": time_zone,
        },
        "end": {
            "dateTime": event.end_date_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": time_zone,
        },
        "attendees": event
            .attendees
            .iter()
            .map(|email| json!({ "email": email }))
            .collect::<Vec<_>>(),
    })
}

fn parse_created(v: &Value) -> Result<CreatedEvent, CalendarError> {
    let id = v["id"]
        .as_str()
        .ok_or_else(|| CalendarError::InvalidResponse("created event has no id".into()))?;
    Ok(CreatedEvent {
        id: id.to_string(),
        html_link: v["htmlLink"].as_str().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> EventData {
        EventData {
            title: "Coffee with Alice".into(),
            start_date_time: Utc.with_ymd_and_hms(2023, 10, 27, 14, 0, 0).unwrap(),
            end_date_time: Utc.with_ymd_and_hms(2023, 10, 27, 15, 0, 0).unwrap(),
            location: Some("Starbucks".into()),
            description: Some("Discuss project".into()),
            attendees: vec!["alice@example.com".into()],
        }
    }

    #[test]
    fn event_body_shape() {
        let body = build_event_body(&event(), "UTC");
        assert_eq!(body["summary"], "Coffee with Alice");
        assert_eq!(body["location"], "Starbucks");
        assert_eq!(body["start"]["dateTime"], "2023-10-27T14:00:00Z");
        assert_eq!(body["end"]["dateTime"], "2023-10-27T15:00:00Z");
        assert_eq!(body["start"]["timeZone"], "UTC");
        assert_eq!(body["attendees"][0]["email"], "alice@example.com");
    }

    #[test]
    fn blank_title_gets_default_and_optional_fields_are_empty() {
        let mut e = event();
        e.title = "  ".into();
        e.location = None;
        e.description = None;
        e.attendees.clear();
        let body = build_event_body(&e, "America/New_York");
        assert_eq!(body["summary"], "New Event");
        assert_eq!(body["location"], "");
        assert_eq!(body["description"], "");
        assert!(body["attendees"].as_array().unwrap().is_empty());
        assert_eq!(body["end"]["timeZone"], "America/New_York");
    }

    #[test]
    fn events_url_encodes_calendar_id() {
        let url = events_url(
            "https://www.googleapis.com/calendar/v3",
            "en.usa#holiday@group.v.calendar.google.com",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/en.usa%23holiday@group.v.calendar.google.com/events"
        );

        let url = events_url("http://127.0.0.1:9000/v3/", "team/shared").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/v3/calendars/team%2Fshared/events"
        );
    }

    #[test]
    fn events_url_rejects_bad_base() {
        assert!(matches!(
            events_url("not a url", "primary"),
            Err(CalendarError::InvalidUrl(_))
        ));
    }

    #[test]
    fn parse_created_reads_id_and_link() {
        let created = parse_created(&json!({"id": "ev1", "htmlLink": "https://cal/ev1"})).unwrap();
        assert_eq!(created.id, "ev1");
        assert_eq!(created.html_link.as_deref(), Some("https://cal/ev1"));
        assert!(parse_created(&json!({})).is_err());
    }
}
