//! Decoder for the chat reply stream.
//!
//! The server answers `POST /api/chat/stream` with server-sent events:
//!
//! ```text
//! data: {"delta":"Hello"}
//!
//! data: {"delta":" there."}
//!
//! data: [DONE]
//!
//! ```
//!
//! A payload may carry `{"error": "..."}` instead of a delta. Blocks that are
//! not `data:` lines or do not parse are dropped here, so only plain text ever
//! reaches the chunker.

use serde::Deserialize;

use crate::stream::utf8::Utf8Decoder;

const EVENT_SEPARATOR: &str = "\n\n";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Error(String),
    Done,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk and return the complete events it finished.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = self.utf8.decode(bytes);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        let Some(split_at) = self.buffer.rfind(EVENT_SEPARATOR) else {
            return events;
        };
        let complete: String = self.buffer.drain(..split_at + EVENT_SEPARATOR.len()).collect();

        for block in complete.split(EVENT_SEPARATOR) {
            let Some(data) = block.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == DONE_MARKER {
                // Anything after the end marker belongs to no reply
                self.buffer.clear();
                events.push(SseEvent::Done);
                break;
            }
            if let Some(event) = parse_payload(data) {
                events.push(event);
            }
        }
        events
    }

    /// End of body. An unterminated trailing block is dropped.
    pub fn finish(&mut self) {
        self.buffer.push_str(&self.utf8.finish());
        if !self.buffer.trim().is_empty() {
            tracing::debug!(len = self.buffer.len(), "dropping unterminated SSE block");
        }
        self.buffer.clear();
    }
}

fn parse_payload(data: &str) -> Option<SseEvent> {
    let payload: Payload = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(data = %data, error = %e, "skipping unparseable SSE payload");
            return None;
        }
    };

    if let Some(message) = payload.error.as_ref().and_then(error_message) {
        return Some(SseEvent::Error(message));
    }
    payload
        .delta
        .filter(|delta| !delta.is_empty())
        .map(SseEvent::Delta)
}

fn error_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
