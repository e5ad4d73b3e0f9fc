//! Extraction: classifies message text into a `Judgment`.
//!
//! The OpenAI-compatible backend forces a single function call
//! (`create_calendar_event`) so the model always answers with structured
//! arguments instead of prose.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::pipeline::types::{EventData, Importance, Intent, Judgment};

/// Name of the function the model is forced to call.
const TOOL_NAME: &str = "create_calendar_event";

/// Temperature for extraction (deterministic-ish).
const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Max characters of message text sent to the model.
const MAX_INPUT_CHARS: usize = 8000;

/// Classification service used by the agent loop.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Judgment, ExtractionError>;
}

/// Extractor backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiExtractor {
    config: ExtractionConfig,
    http: reqwest::Client,
}

impl OpenAiExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn classify(&self, text: &str) -> Result<Judgment, ExtractionError> {
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let request = json!({
            "model": self.config.model,
            "temperature": EXTRACTION_TEMPERATURE,
            "messages": [
                {"role": "system", "content": build_system_prompt(Local::now())},
                {"role": "user", "content": input},
            ],
            "tools": [tool_definition()],
            "tool_choice": {"type": "function", "function": {"name": TOOL_NAME}},
        });

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let arguments = completion_arguments(completion)?;
        debug!(arguments = %arguments, "Extraction tool call received");
        parse_judgment(&arguments)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_system_prompt(now: DateTime<Local>) -> String {
    format!(
        "You are an assistant that reads emails and extracts calendar events.\n\
         Current date and time: {now}\n\n\
         Call {TOOL_NAME} exactly once.\n\
         - Intent: \"Meeting\", \"Registration\" or \"Event\" when the email describes something \
           that belongs on a calendar, otherwise \"None\".\n\
         - Category: a short label such as \"Work\", \"Personal\", \"Finance\", \"Social\" or \"Promotions\".\n\
         - Importance: \"High\", \"Medium\" or \"Low\" for how much the user needs to see this email.\n\
         - EventData: only when Intent is not \"None\". Resolve relative dates (\"tomorrow at 2 PM\") \
           against the current date and time and give ISO 8601 timestamps with an offset. \
           If no end time is given, assume one hour after the start.\n\
         - location: prefer the full street address (so maps links work) or the meeting URL \
           (Zoom/Meet) for virtual events.\n\
         - description: one or two sentences covering the agenda or key details.\n\
         - attendees: other participants' email addresses, never the recipient.",
        now = now.to_rfc3339()
    )
}

fn tool_definition() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Extracts event data from an email body for calendar insertion.",
            "parameters": {
                "type": "object",
                "required": ["Intent", "Category", "Importance", "EventData"],
                "properties": {
                    "Intent": {
                        "type": "string",
                        "description": "The primary purpose of the email.",
                        "enum": ["Meeting", "Registration", "Event", "None"]
                    },
                    "Category": {
                        "type": "string",
                        "description": "Short free-form label for the email."
                    },
                    "Importance": {
                        "type": "string",
                        "enum": ["Low", "Medium", "High"]
                    },
                    "EventData": {
                        "type": "object",
                        "required": ["title", "startDateTime", "endDateTime"],
                        "properties": {
                            "title": {"type": "string", "description": "Concise event title."},
                            "startDateTime": {"type": "string", "description": "ISO 8601 start date/time."},
                            "endDateTime": {"type": "string", "description": "ISO 8601 end date/time."},
                            "location": {"type": "string", "description": "Full address or meeting URL."},
                            "description": {"type": "string", "description": "Event summary, agenda or key details."},
                            "attendees": {
                                "type": "array",
                                "items": {"type": "string", "format": "email"},
                                "description": "Email addresses of other participants (excluding the user)."
                            }
                        }
                    }
                }
            }
        }
    })
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    arguments: String,
}

/// Pull the tool-call arguments out of a completion. Falls back to a JSON
/// object embedded in the text content if the model ignored the tool.
fn completion_arguments(completion: ChatCompletion) -> Result<String, ExtractionError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ExtractionError::InvalidResponse("no choices in completion".into()))?
        .message;

    if let Some(call) = message.tool_calls.into_iter().next() {
        return Ok(call.function.arguments);
    }

    match message.content {
        Some(text) if !text.trim().is_empty() => Ok(extract_json_object(&text)),
        _ => Err(ExtractionError::InvalidResponse(
            "completion has neither tool calls nor content".into(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    #[serde(rename = "Intent")]
    intent: String,
    #[serde(rename = "Category", default)]
    category: Option<String>,
    #[serde(rename = "Importance", default)]
    importance: Option<String>,
    #[serde(rename = "EventData", default)]
    event_data: Option<RawEventData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start_date_time: Option<String>,
    #[serde(default)]
    end_date_time: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    attendees: Option<Vec<String>>,
}

/// Parse tool-call arguments into a `Judgment`.
pub fn parse_judgment(arguments: &str) -> Result<Judgment, ExtractionError> {
    let raw: RawJudgment = serde_json::from_str(&extract_json_object(arguments))?;

    let intent = parse_intent(&raw.intent).ok_or_else(|| {
        ExtractionError::InvalidResponse(format!("unknown intent: '{}'", raw.intent))
    })?;

    let category = raw
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let importance = raw
        .importance
        .as_deref()
        .map(parse_importance)
        .unwrap_or_default();

    let event_data = raw.event_data.and_then(build_event_data);

    Ok(Judgment {
        intent,
        category,
        importance,
        event_data,
    })
}

fn parse_intent(raw: &str) -> Option<Intent> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "meeting" => Some(Intent::Meeting),
        "registration" => Some(Intent::Registration),
        "event" => Some(Intent::Event),
        "none" | "" => Some(Intent::None),
        _ => None,
    }
}

fn parse_importance(raw: &str) -> Importance {
    match raw.trim().to_ascii_lowercase().as_str() {
        "high" => Importance::High,
        "medium" => Importance::Medium,
        _ => Importance::Low,
    }
}

/// Validate raw event fields. Missing title/start/end, unparseable
/// timestamps, or an end before the start all yield no event.
fn build_event_data(raw: RawEventData) -> Option<EventData> {
    let title = non_empty(raw.title)?;
    let start = parse_timestamp(raw.start_date_time.as_deref()?)?;
    let end = parse_timestamp(raw.end_date_time.as_deref()?)?;

    if end < start {
        warn!(title = %title, %start, %end, "Dropping event data: end is before start");
        return None;
    }

    Some(EventData {
        title,
        start_date_time: start,
        end_date_time: end,
        location: non_empty(raw.location),
        description: non_empty(raw.description),
        attendees: raw
            .attendees
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// RFC 3339 with offset, or a bare `YYYY-MM-DDTHH:MM:SS` read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            warn!(value = %raw, error = %e, "Unparseable event timestamp");
            None
        }
    }
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
