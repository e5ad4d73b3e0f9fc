//! Gmail API v1 inbox client.
//!
//! Lists message IDs matching a search query, then fetches each message
//! in full to pull Subject/From headers and the plain-text body.
//! A message that fails to load is logged and skipped. Marking read
//! removes the `UNREAD` label.

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::Inbox;
use crate::config::GmailConfig;
use crate::error::InboxError;
use crate::pipeline::types::Message;

/// Gmail emits base64url, sometimes padded and sometimes not.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Gmail REST client.
pub struct GmailInbox {
    config: GmailConfig,
    http: reqwest::Client,
}

impl GmailInbox {
    pub fn new(config: GmailConfig) -> Result<Self, InboxError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, InboxError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(InboxError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_message(&self, id: &str) -> Result<Message, InboxError> {
        let response = self
            .http
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(self.config.access_token.expose_secret())
            .query(&[("format", "full")])
            .send()
            .await?;
        let value: Value = Self::check(response).await?.json().await?;
        parse_message(&value)
    }
}

#[async_trait]
impl Inbox for GmailInbox {
    async fn fetch_unread(
        &self,
        max_results: u32,
        query: &str,
    ) -> Result<Vec<Message>, InboxError> {
        let response = self
            .http
            .get(self.url("messages"))
            .bearer_auth(self.config.access_token.expose_secret())
            .query(&[("q", query.to_string()), ("maxResults", max_results.to_string())])
            .send()
            .await?;
        let listing: Value = Self::check(response).await?.json().await?;

        let ids = list_message_ids(&listing);
        debug!(count = ids.len(), query = %query, "Gmail listed messages");

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_message(&id).await {
                Ok(message) => messages.push(message),
                Err(e) => warn!(id = %id, error = %e, "Failed to fetch message, skipping"),
            }
        }
        Ok(messages)
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), InboxError> {
        let response = self
            .http
            .post(self.url(&format!("messages/{message_id}/modify")))
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        Self::check(response).await?;
        info!(id = %message_id, "Marked message as read");
        Ok(())
    }
}

// ── Response parsing ────────────────────────────────────────────────

fn list_message_ids(listing: &Value) -> Vec<String> {
    listing["messages"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_message(v: &Value) -> Result<Message, InboxError> {
    let id = v["id"]
        .as_str()
        .ok_or_else(|| InboxError::InvalidResponse("message without id".into()))?
        .to_string();
    let payload = &v["payload"];

    Ok(Message {
        id,
        subject: get_header(payload, "Subject").unwrap_or_else(|| "No Subject".to_string()),
        sender: get_header(payload, "From").unwrap_or_else(|| "Unknown Sender".to_string()),
        body: extract_body(payload),
    })
}

/// Case-insensitive header lookup.
fn get_header(payload: &Value, name: &str) -> Option<String> {
    payload["headers"]
        .as_array()?
        .iter()
        .find(|h| {
            h["name"]
                .as_str()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h["value"].as_str())
        .map(str::to_string)
}

/// Concatenate every `text/plain` part, descending into nested multiparts.
/// Single-part messages carry their data directly on the payload body.
fn extract_body(payload: &Value) -> String {
    match payload["parts"].as_array() {
        Some(parts) => {
            let mut body = String::new();
            for part in parts {
                let mime_type = part["mimeType"].as_str().unwrap_or("");
                if mime_type == "text/plain" {
                    if let Some(text) = decode_part(part) {
                        body.push_str(&text);
                    }
                } else if mime_type.starts_with("multipart/") {
                    body.push_str(&extract_body(part));
                }
            }
            body
        }
        None => decode_part(payload).unwrap_or_default(),
    }
}

fn decode_part(part: &Value) -> Option<String> {
    let data = part["body"]["data"].as_str()?;
    let bytes = BASE64URL.decode(data.trim()).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::json;

    /// Local Gmail stand-in listing three messages; `bad` returns 500.
    async fn stub_gmail() -> String {
        let app = Router::new()
            .route(
                "/messages",
                get(|| async {
                    Json(json!({"messages": [{"id": "ok1"}, {"id": "bad"}, {"id": "ok2"}]}))
                }),
            )
            .route(
                "/messages/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "bad" {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json(json!({
                        "id": id,
                        "payload": {
                            "headers": [{"name": "Subject", "value": format!("Subject {id}")}],
                            "body": {"data": encode("hello")}
                        }
                    })))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn encode(s: &str) -> String {
        BASE64URL.encode(s.as_bytes())
    }

    #[test]
    fn parse_simple_message() {
        let raw = json!({
            "id": "abc",
            "payload": {
                "headers": [
                    {"name": "Subject", "value": "Lunch?"},
                    {"name": "from", "value": "Bob <bob@example.com>"}
                ],
                "body": {"data": encode("Noon at the usual place")}
            }
        });
        let msg = parse_message(&raw).unwrap();
        assert_eq!(msg.id, "abc");
        assert_eq!(msg.subject, "Lunch?");
        assert_eq!(msg.sender, "Bob <bob@example.com>");
        assert_eq!(msg.body, "Noon at the usual place");
    }

    #[test]
    fn missing_headers_get_defaults() {
        let raw = json!({"id": "x", "payload": {"headers": []}});
        let msg = parse_message(&raw).unwrap();
        assert_eq!(msg.subject, "No Subject");
        assert_eq!(msg.sender, "Unknown Sender");
        assert!(msg.body.is_empty());
    }

    #[test]
    fn message_without_id_is_rejected() {
        let raw = json!({"payload": {}});
        assert!(matches!(
            parse_message(&raw),
            Err(InboxError::InvalidResponse(_))
        ));
    }

    #[test]
    fn multipart_body_uses_plain_text_parts_only() {
        let payload = json!({
            "mimeType": "multipart/mixed",
            "parts": [
                {
                    "mimeType": "multipart/alternative",
                    "parts": [
                        {"mimeType": "text/plain", "body": {"data": encode("Hello ")}},
                        {"mimeType": "text/html", "body": {"data": encode("<b>Hello</b>")}}
                    ]
                },
                {"mimeType": "text/plain", "body": {"data": encode("world")}}
            ]
        });
        assert_eq!(extract_body(&payload), "Hello world");
    }

    #[test]
    fn decodes_padded_base64url() {
        let part = json!({"body": {"data": "aGk="}});
        assert_eq!(decode_part(&part).as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn failed_message_is_skipped_not_fatal() {
        let inbox = GmailInbox::new(GmailConfig {
            access_token: SecretString::from("test-token".to_string()),
            api_base: stub_gmail().await,
        })
        .unwrap();

        let messages = inbox.fetch_unread(5, "is:unread").await.unwrap();

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["ok1", "ok2"]);
        assert_eq!(messages[1].subject, "Subject ok2");
        assert_eq!(messages[0].body, "hello");
    }

    #[test]
    fn list_ids_handles_empty_listing() {
        assert!(list_message_ids(&json!({"resultSizeEstimate": 0})).is_empty());
        let ids = list_message_ids(&json!({"messages": [{"id": "1"}, {"id": "2"}]}));
        assert_eq!(ids, vec!["1", "2"]);
    }
}
