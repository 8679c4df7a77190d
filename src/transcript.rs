//! Transcript store
//!
//! Ordered, append-only log of messages. The only destructive operation is
//! `reset`, which replaces the whole log with a single greeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique message identifier, never reused within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

/// A single transcript entry. Fields are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    content: String,
    sender: Sender,
    timestamp: DateTime<Utc>,
    /// Opaque map markup, passed through byte-for-byte
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_fragment: Option<String>,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::User,
            timestamp,
            map_fragment: None,
        }
    }

    pub fn agent(
        id: MessageId,
        content: impl Into<String>,
        map_fragment: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::Agent,
            timestamp,
            map_fragment,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The fragment if it carries anything worth rendering
    pub fn map_fragment(&self) -> Option<&str> {
        self.map_fragment
            .as_deref()
            .filter(|fragment| !fragment.trim().is_empty())
    }
}

#[cfg(test)]
impl Message {
    /// The raw fragment exactly as received, including blank values
    pub fn raw_map_fragment(&self) -> Option<&str> {
        self.map_fragment.as_deref()
    }
}

/// Ordered message log; insertion order is display order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Start a transcript containing only `greeting`
    pub fn with_greeting(greeting: Message) -> Self {
        Self {
            messages: vec![greeting],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace every message with `greeting`
    pub fn reset(&mut self, greeting: Message) {
        self.messages.clear();
        self.messages.push(greeting);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }
}
