//! Message model representing a single mail message as exported

use super::ThreadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message inside the mail store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like `"John Doe" <john@example.com>`
    ///
    /// Surrounding quotes on the display name are dropped. Anything without a
    /// well-formed trailing `<...>` is kept verbatim as the address.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if s.ends_with('>')
            && let Some(angle_start) = s.rfind('<')
        {
            let email = s[angle_start + 1..s.len() - 1].trim();
            if !email.is_empty() {
                let name = s[..angle_start].trim().trim_matches('"').trim();
                return Self {
                    name: if name.is_empty() {
                        None
                    } else {
                        Some(name.to_string())
                    },
                    email: email.to_string(),
                };
            }
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Where the bytes of an attachment live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentContent {
    /// Bytes delivered together with the message
    Inline(Vec<u8>),
    /// Bytes that must be fetched from the mail store on demand
    Remote { attachment_id: String },
}

/// A file attached to (or embedded in) a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name as sent
    pub filename: String,
    /// MIME type reported by the mail store
    pub mime_type: String,
    /// Size in bytes as reported by the mail store
    pub size: usize,
    pub content: AttachmentContent,
}

impl Attachment {
    /// Create an attachment whose bytes are already known
    pub fn inline(filename: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            size: data.len(),
            content: AttachmentContent::Inline(data),
        }
    }

    /// Create an attachment that is resolved through the mail store later
    pub fn remote(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        size: usize,
        attachment_id: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            size,
            content: AttachmentContent::Remote {
                attachment_id: attachment_id.into(),
            },
        }
    }
}

/// A single email message within a thread
///
/// Header fields are kept as the raw text supplied by the mail store so the
/// rendered archive shows exactly what was received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Mail store message ID
    pub id: MessageId,
    /// ID of the thread this message belongs to
    pub thread_id: ThreadId,
    /// RFC 5322 `Message-ID` header, if present
    pub rfc822_id: Option<String>,
    /// Raw `From` header
    pub from: String,
    /// Raw `To` header
    pub to: String,
    /// Raw `Cc` header (empty if absent)
    pub cc: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub body_text: String,
    /// HTML body (empty if the message had none)
    pub body_html: String,
    /// When the message was sent, normalized to UTC
    pub received_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId, thread_id: ThreadId) -> MessageBuilder {
        MessageBuilder::new(id, thread_id)
    }

    /// Stable identifier used in rendered headers and attachment names.
    ///
    /// Prefers the `Message-ID` header and falls back to the store ID.
    pub fn stable_id(&self) -> &str {
        match self.rfc822_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => self.id.as_str(),
        }
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    thread_id: ThreadId,
    rfc822_id: Option<String>,
    from: String,
    to: String,
    cc: String,
    subject: String,
    body_text: String,
    body_html: String,
    received_at: Option<DateTime<Utc>>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    fn new(id: MessageId, thread_id: ThreadId) -> Self {
        Self {
            id,
            thread_id,
            rfc822_id: None,
            from: String::new(),
            to: String::new(),
            cc: String::new(),
            subject: String::new(),
            body_text: String::new(),
            body_html: String::new(),
            received_at: None,
            attachments: Vec::new(),
        }
    }

    pub fn rfc822_id(mut self, rfc822_id: impl Into<String>) -> Self {
        self.rfc822_id = Some(rfc822_id.into());
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    pub fn cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = cc.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body_text(mut self, body_text: impl Into<String>) -> Self {
        self.body_text = body_text.into();
        self
    }

    pub fn body_html(mut self, body_html: impl Into<String>) -> Self {
        self.body_html = body_html.into();
        self
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            thread_id: self.thread_id,
            rfc822_id: self.rfc822_id,
            from: self.from,
            to: self.to,
            cc: self.cc,
            subject: self.subject,
            body_text: self.body_text,
            body_html: self.body_html,
            received_at: self.received_at.unwrap_or_else(Utc::now),
            attachments: self.attachments,
        }
    }
}
