//! Incremental sentence chunking for text that arrives in fragments.
//!
//! The chunker decides which parts of a live stream are complete enough to
//! hand to a speech engine. Emitted text is cut from the buffer so it is
//! never spoken twice, and short sentences wait to be merged with the next
//! one instead of being spoken as tiny fragments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::tts::segmentation::boundaries;

/// Shared on/off switch for speech output.
///
/// Clones share the same flag, so a UI handle and the chunker always agree.
#[derive(Debug, Clone, Default)]
pub struct SpeechToggle(Arc<AtomicBool>);

impl SpeechToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Live-reading accessor for [`IncrementalChunker::new`].
    pub fn accessor(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let flag = Arc::clone(&self.0);
        move || flag.load(Ordering::SeqCst)
    }
}

pub struct IncrementalChunker {
    buffer: String,
    enabled: Box<dyn Fn() -> bool + Send + Sync>,
    min_chunk_len: usize,
}

impl IncrementalChunker {
    /// `enabled` is called on every `ingest`, `drain` and `flush`; it is never cached.
    /// A `min_chunk_len` of zero is treated as one.
    pub fn new<F>(min_chunk_len: usize, enabled: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            buffer: String::new(),
            enabled: Box::new(enabled),
            min_chunk_len: min_chunk_len.max(1),
        }
    }

    pub fn min_chunk_len(&self) -> usize {
        self.min_chunk_len
    }

    pub fn is_enabled(&self) -> bool {
        (self.enabled)()
    }

    /// Text received but not yet emitted.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append a raw stream fragment and return the spans it completed.
    ///
    /// While disabled the fragment is still buffered, so a later [`drain`](Self::drain)
    /// can speak it.
    pub fn ingest(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        if !self.is_enabled() {
            return Vec::new();
        }
        self.emit_from_buffer()
    }

    /// Scan the buffer without new input, e.g. right after speech is switched on.
    pub fn drain(&mut self) -> Vec<String> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.emit_from_buffer()
    }

    /// End of stream: hand out whatever is left, ignoring the minimum length.
    /// When disabled the tail is discarded.
    pub fn flush(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.buffer);
        if !self.is_enabled() {
            tracing::debug!(discarded = tail.len(), "flush while disabled");
            return None;
        }
        let tail = tail.trim();
        if tail.is_empty() {
            None
        } else {
            tracing::debug!(len = tail.len(), "flushed tail");
            Some(tail.to_string())
        }
    }

    pub fn cancel(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(discarded = self.buffer.len(), "chunker cancelled");
        }
        self.buffer.clear();
    }

    // Full rescan from the start of the buffer on every call; rejected short
    // candidates are reconsidered together with the text that follows them.
    fn emit_from_buffer(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        let mut last = 0;

        for boundary in boundaries(&self.buffer) {
            let sentence = self.buffer[last..boundary.end].trim();
            if sentence.chars().count() >= self.min_chunk_len {
                out.push(sentence.to_string());
                last = boundary.next;
            }
        }

        if !out.is_empty() {
            self.buffer.drain(..last);
            tracing::trace!(spans = out.len(), retained = self.buffer.len(), "emitted spans");
        }
        out
    }
}

impl std::fmt::Debug for IncrementalChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalChunker")
            .field("buffer", &self.buffer)
            .field("enabled", &self.is_enabled())
            .field("min_chunk_len", &self.min_chunk_len)
            .finish()
    }
}
