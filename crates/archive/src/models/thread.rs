//! Thread model representing a conversation snapshot taken at export time

use serde::{Deserialize, Serialize};

use super::Message;

/// Unique identifier for a thread (mail store thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last `len` characters of the ID, used as a short name suffix
    pub fn short(&self, len: usize) -> &str {
        let count = self.0.chars().count();
        if count <= len {
            return &self.0;
        }
        let start = self
            .0
            .char_indices()
            .nth(count - len)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.0[start..]
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A thread is an ordered, non-empty group of messages
///
/// Messages keep the order the mail store returned them in (chronological).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    id: ThreadId,
    messages: Vec<Message>,
}

impl Thread {
    /// Create a thread snapshot, or `None` if there are no messages
    pub fn new(id: ThreadId, messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self { id, messages })
    }

    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The first message, which determines the thread's archive name
    pub fn first(&self) -> &Message {
        &self.messages[0]
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn attachment_count(&self) -> usize {
        self.messages.iter().map(|m| m.attachments.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;

    #[test]
    fn test_empty_thread_rejected() {
        assert!(Thread::new(ThreadId::new("t1"), Vec::new()).is_none());
    }

    #[test]
    fn test_first_message() {
        let messages = vec![
            Message::builder(MessageId::new("m1"), ThreadId::new("t1"))
                .subject("First")
                .build(),
            Message::builder(MessageId::new("m2"), ThreadId::new("t1"))
                .subject("Re: First")
                .build(),
        ];
        let thread = Thread::new(ThreadId::new("t1"), messages).unwrap();
        assert_eq!(thread.first().subject, "First");
        assert_eq!(thread.message_count(), 2);
    }

    #[test]
    fn test_short_id() {
        let id = ThreadId::new("18c2f9a0b1d2e3f4");
        assert_eq!(id.short(8), "b1d2e3f4");
        assert_eq!(ThreadId::new("abc").short(8), "abc");
        assert_eq!(ThreadId::new("").short(8), "");
    }
}
