use serde::{Deserialize, Serialize};

use crate::config::StreamerConfig;
use crate::tts::chunker::{IncrementalChunker, SpeechToggle};
use crate::tts::normalize::clean_for_speech;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOptions {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

/// One finished piece of text plus the voice settings to speak it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
}

/// The speech engine seen from the streamer.
pub trait SpeechSink {
    /// Queue an utterance behind anything already playing.
    fn speak(&mut self, utterance: Utterance);
    /// Stop the current utterance and drop everything queued.
    fn stop(&mut self);
}

/// Speaks a streamed reply sentence by sentence.
pub struct TtsStreamer<S: SpeechSink> {
    chunker: IncrementalChunker,
    toggle: SpeechToggle,
    voice: VoiceOptions,
    sink: S,
}

impl<S: SpeechSink> TtsStreamer<S> {
    pub fn new(config: &StreamerConfig, toggle: SpeechToggle, sink: S) -> Self {
        let chunker = IncrementalChunker::new(config.min_chunk_len, toggle.accessor());
        Self {
            chunker,
            toggle,
            voice: config.voice.clone(),
            sink,
        }
    }

    pub fn toggle(&self) -> &SpeechToggle {
        &self.toggle
    }

    pub fn chunker(&self) -> &IncrementalChunker {
        &self.chunker
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Feed a stream fragment. Returns how many utterances reached the sink.
    pub fn ingest(&mut self, delta: &str) -> usize {
        let spans = self.chunker.ingest(delta);
        self.speak_all(spans)
    }

    /// Speak whatever piled up while speech was off.
    pub fn drain(&mut self) -> usize {
        let spans = self.chunker.drain();
        self.speak_all(spans)
    }

    /// The stream ended; speak the remaining tail.
    pub fn flush(&mut self) -> usize {
        let tail = self.chunker.flush();
        self.speak_all(tail)
    }

    /// Stop speaking immediately and forget buffered text.
    pub fn cancel(&mut self) {
        self.sink.stop();
        self.chunker.cancel();
    }

    /// Flip speech on or off mid-stream.
    pub fn set_enabled(&mut self, enabled: bool) -> usize {
        self.toggle.set(enabled);
        if enabled {
            self.drain()
        } else {
            self.cancel();
            0
        }
    }

    fn speak_all(&mut self, spans: impl IntoIterator<Item = String>) -> usize {
        let mut spoken = 0;
        for span in spans {
            if self.speak(&span) {
                spoken += 1;
            }
        }
        spoken
    }

    fn speak(&mut self, text: &str) -> bool {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            tracing::trace!(span = %text, "nothing speakable in span");
            return false;
        }
        self.sink.speak(Utterance {
            text: cleaned,
            lang: self.voice.lang.clone(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
        });
        true
    }
}
