use futures::StreamExt;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::history::ChatMessage;
use crate::stream::sse::{SseDecoder, SseEvent};

pub const CHAT_STREAM_PATH: &str = "/api/chat/stream";

/// Client for the streaming chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CHAT_STREAM_PATH)
    }

    /// Send the conversation and call `on_event` for every event of the reply,
    /// in arrival order. Returns once the response body is exhausted.
    pub async fn stream_chat<F>(&self, messages: &[ChatMessage], mut on_event: F) -> Result<()>
    where
        F: FnMut(SseEvent),
    {
        let url = self.endpoint();
        tracing::debug!(%url, messages = messages.len(), "starting chat stream");

        let resp = self
            .http
            .post(&url)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        let mut decoder = SseDecoder::new();
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                on_event(event);
            }
        }
        decoder.finish();
        Ok(())
    }
}
