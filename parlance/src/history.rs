//! Chat history kept between runs, stored as a JSON array on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const SYSTEM_PROMPT: &str = "You are a helpful nutrition assistant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatHistory {
    path: PathBuf,
}

impl ChatHistory {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored messages, oldest first. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<ChatMessage>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, items: &[ChatMessage]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(items)?)?;
        tracing::debug!(path = %self.path.display(), count = items.len(), "saved chat history");
        Ok(())
    }

    pub fn push(&self, message: ChatMessage) -> Result<Vec<ChatMessage>> {
        let mut items = self.load()?;
        items.push(message);
        self.save(&items)?;
        Ok(items)
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The stored conversation prefixed with the system prompt, ready to send.
    pub fn conversation(&self) -> Result<Vec<ChatMessage>> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.load()?);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::open(dir.path().join("history.json"));
        assert!(history.load().unwrap().is_empty());
        history.clear().unwrap();
    }

    #[test]
    fn test_push_persists_and_conversation_adds_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let history = ChatHistory::open(&path);

        history.push(ChatMessage::user("What is for dinner?")).unwrap();
        history.push(ChatMessage::assistant("Lentil soup.")).unwrap();

        let reopened = ChatHistory::open(&path);
        let conversation = reopened.conversation().unwrap();
        assert_eq!(
            conversation,
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user("What is for dinner?"),
                ChatMessage::assistant("Lentil soup."),
            ]
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""role":"user""#));
    }

    #[test]
    fn test_cloned_handles_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::open(dir.path().join("history.json"));
        let other = history.clone();

        history.push(ChatMessage::user("one")).unwrap();
        let items = other.push(ChatMessage::assistant("two")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(history.load().unwrap(), items);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::open(dir.path().join("history.json"));
        history.save(&[ChatMessage::user("hi")]).unwrap();
        history.clear().unwrap();
        assert!(!history.path().exists());
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ChatHistory::open(path).load(), Err(Error::Json(_))));
    }
}
