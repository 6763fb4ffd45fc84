use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use parlance::tts::streamer::{SpeechSink, TtsStreamer, Utterance};
use parlance::{SpeechToggle, StreamerConfig};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Deserialize)]
struct ClientCommand {
    command: String,
    text: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Utterance {
        text: String,
        lang: String,
        rate: f32,
        pitch: f32,
        index: usize,
    },
    Stop,
    Status {
        enabled: bool,
        pending: usize,
    },
    Error {
        message: String,
    },
}

/// Sink that queues utterances as outgoing socket messages.
#[derive(Debug, Default)]
struct QueueSink {
    queued: Vec<ServerMessage>,
    index: usize,
}

impl QueueSink {
    fn take(&mut self) -> Vec<ServerMessage> {
        std::mem::take(&mut self.queued)
    }
}

impl SpeechSink for QueueSink {
    fn speak(&mut self, utterance: Utterance) {
        self.queued.push(ServerMessage::Utterance {
            text: utterance.text,
            lang: utterance.lang,
            rate: utterance.rate,
            pitch: utterance.pitch,
            index: self.index,
        });
        self.index += 1;
    }

    fn stop(&mut self) {
        self.queued.push(ServerMessage::Stop);
    }
}

fn error(message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        message: message.into(),
    }
}

/// Apply one raw client frame and return the replies in send order.
fn handle_command(streamer: &mut TtsStreamer<QueueSink>, raw: &str) -> Vec<ServerMessage> {
    let cmd = match serde_json::from_str::<ClientCommand>(raw) {
        Ok(cmd) => cmd,
        Err(e) => return vec![error(format!("invalid command: {e}"))],
    };

    let reply = match cmd.command.as_str() {
        "ingest" => match cmd.text {
            Some(text) => {
                streamer.ingest(&text);
                None
            }
            None => Some(error("ingest requires text")),
        },
        "drain" => {
            streamer.drain();
            None
        }
        "flush" => {
            streamer.flush();
            None
        }
        "cancel" => {
            streamer.cancel();
            None
        }
        "set_enabled" => match cmd.enabled {
            Some(enabled) => {
                streamer.set_enabled(enabled);
                None
            }
            None => Some(error("set_enabled requires enabled")),
        },
        "status" => Some(ServerMessage::Status {
            enabled: streamer.toggle().get(),
            pending: streamer.chunker().pending().chars().count(),
        }),
        other => Some(error(format!("unknown command: {other}"))),
    };

    let mut out = streamer.sink_mut().take();
    out.extend(reply);
    out
}

async fn handle_connection(stream: TcpStream, config: StreamerConfig) {
    let peer = stream.peer_addr().ok();
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(?peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    tracing::debug!(?peer, "client connected");

    let mut streamer = TtsStreamer::new(&config, SpeechToggle::new(true), QueueSink::default());
    let (mut write, mut read) = ws_stream.split();

    while let Some(Ok(msg)) = read.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        for reply in handle_command(&mut streamer, &text) {
            match serde_json::to_string(&reply) {
                Ok(json) => {
                    if write.send(Message::Text(json)).await.is_err() {
                        tracing::debug!(?peer, "client went away mid-reply");
                        return;
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to encode reply"),
            }
        }
    }
    tracing::debug!(?peer, "client disconnected");
}

/// Serve clients on an already bound listener.
pub async fn serve(listener: TcpListener, config: StreamerConfig) -> tokio::io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let config = config.clone();
        tokio::spawn(async move {
            handle_connection(stream, config).await;
        });
    }
}

/// Start the WebSocket server
pub async fn start_server(config: StreamerConfig, addr: SocketAddr) -> tokio::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "WebSocket server listening");
    serve(listener, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streamer() -> TtsStreamer<QueueSink> {
        let config = StreamerConfig {
            min_chunk_len: 10,
            ..Default::default()
        };
        TtsStreamer::new(&config, SpeechToggle::new(true), QueueSink::default())
    }

    fn texts(replies: &[ServerMessage]) -> Vec<&str> {
        replies
            .iter()
            .filter_map(|r| match r {
                ServerMessage::Utterance { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ingest_and_flush_produce_indexed_utterances() {
        let mut s = streamer();
        let replies = handle_command(&mut s, r#"{"command":"ingest","text":"Hello world. Tail"}"#);
        assert_eq!(texts(&replies), vec!["Hello world."]);

        let replies = handle_command(&mut s, r#"{"command":"flush"}"#);
        match &replies[..] {
            [ServerMessage::Utterance { text, index, lang, .. }] => {
                assert_eq!(text, "Tail");
                assert_eq!(*index, 1);
                assert_eq!(lang, "en-US");
            }
            other => panic!("unexpected replies: {other:?}"),
        }
    }

    #[test]
    fn test_disable_then_enable_drains() {
        let mut s = streamer();
        assert_eq!(
            handle_command(&mut s, r#"{"command":"set_enabled","enabled":false}"#),
            vec![ServerMessage::Stop]
        );
        assert!(handle_command(&mut s, r#"{"command":"ingest","text":"Quiet sentence here. "}"#).is_empty());
        assert_eq!(
            handle_command(&mut s, r#"{"command":"status"}"#),
            vec![ServerMessage::Status {
                enabled: false,
                pending: 21
            }]
        );
        let replies = handle_command(&mut s, r#"{"command":"set_enabled","enabled":true}"#);
        assert_eq!(texts(&replies), vec!["Quiet sentence here."]);
    }

    #[test]
    fn test_status_counts_pending_chars() {
        let mut s = streamer();
        handle_command(&mut s, r#"{"command":"ingest","text":"Crème brûlée"}"#);
        assert_eq!(
            handle_command(&mut s, r#"{"command":"status"}"#),
            vec![ServerMessage::Status {
                enabled: true,
                pending: 12
            }]
        );
    }

    #[test]
    fn test_cancel_sends_stop() {
        let mut s = streamer();
        handle_command(&mut s, r#"{"command":"ingest","text":"never finished"}"#);
        assert_eq!(
            handle_command(&mut s, r#"{"command":"cancel"}"#),
            vec![ServerMessage::Stop]
        );
        assert!(handle_command(&mut s, r#"{"command":"flush"}"#).is_empty());
    }

    #[test]
    fn test_bad_commands_report_errors() {
        let mut s = streamer();
        for raw in [
            "not json",
            r#"{"command":"ingest"}"#,
            r#"{"command":"set_enabled"}"#,
            r#"{"command":"sing"}"#,
        ] {
            let replies = handle_command(&mut s, raw);
            assert!(
                matches!(replies.as_slice(), [ServerMessage::Error { .. }]),
                "{raw}: {replies:?}"
            );
        }
    }

    #[test]
    fn test_reply_wire_format() {
        let json = serde_json::to_value(ServerMessage::Status {
            enabled: true,
            pending: 3,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "status", "enabled": true, "pending": 3})
        );
    }

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, StreamerConfig::default()));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"command":"ingest","text":"Short. "}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(r#"{"command":"flush"}"#.to_string()))
            .await
            .unwrap();

        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        };
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "utterance");
        assert_eq!(value["text"], "Short.");
        assert_eq!(value["index"], 0);
    }
}
