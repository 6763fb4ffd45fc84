use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tts::streamer::VoiceOptions;

pub const DEFAULT_MIN_CHUNK_LEN: usize = 45;

/// Settings for a [`TtsStreamer`](crate::tts::streamer::TtsStreamer).
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "min_chunk_len": 30, "voice": { "lang": "en-GB", "rate": 1.1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Shortest sentence (in characters) spoken on its own.
    #[serde(default = "default_min_chunk_len")]
    pub min_chunk_len: usize,
    #[serde(default)]
    pub voice: VoiceOptions,
}

fn default_min_chunk_len() -> usize {
    DEFAULT_MIN_CHUNK_LEN
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            min_chunk_len: default_min_chunk_len(),
            voice: VoiceOptions::default(),
        }
    }
}

impl StreamerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), ?config, "loaded streamer config");
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_len == 0 {
            return Err(Error::Config("min_chunk_len must be at least 1".into()));
        }
        if !(self.voice.rate > 0.0) {
            return Err(Error::Config(format!(
                "voice rate must be positive, got {}",
                self.voice.rate
            )));
        }
        if !(self.voice.pitch > 0.0) {
            return Err(Error::Config(format!(
                "voice pitch must be positive, got {}",
                self.voice.pitch
            )));
        }
        if self.voice.lang.trim().is_empty() {
            return Err(Error::Config("voice lang must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "voice": {{ "rate": 1.5 }} }}"#).unwrap();

        let config = StreamerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.min_chunk_len, 45);
        assert_eq!(config.voice.lang, "en-US");
        assert_eq!(config.voice.rate, 1.5);
        assert_eq!(config.voice.pitch, 1.0);
    }

    #[test]
    fn test_rejects_zero_minimum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "min_chunk_len": 0 }}"#).unwrap();
        assert!(matches!(
            StreamerConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_voice() {
        let mut config = StreamerConfig::default();
        config.voice.rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = StreamerConfig::default();
        config.voice.pitch = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = StreamerConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
