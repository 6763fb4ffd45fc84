pub mod config;
pub mod error;
pub mod history;
pub mod plan;
pub mod stream;
pub mod tts;
pub mod utils;

// Re-export key functionality for easy access
pub use config::StreamerConfig;
pub use error::{Error, Result};
pub use tts::chunker::{IncrementalChunker, SpeechToggle};
pub use tts::streamer::{SpeechSink, TtsStreamer, Utterance, VoiceOptions};
