//! Gmail API response normalization
//!
//! Converts Gmail API threads and messages to domain models. Header values
//! are kept verbatim; bodies are decoded; attachments become inline bytes or
//! references to fetch later.

use anyhow::{Context, Result};
use base64::prelude::*;
use chrono::{TimeZone, Utc};
use log::debug;

use super::api::{GmailMessage, GmailThread, MessageBody, MessagePart, MessagePayload};
use crate::models::{Attachment, Message, MessageId, Thread, ThreadId};

/// Normalize a Gmail thread; `None` if it has no messages
pub fn normalize_thread(gmail_thread: GmailThread) -> Result<Option<Thread>> {
    let id = ThreadId::new(&gmail_thread.id);
    let messages = gmail_thread
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(normalize_message)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to normalize thread {}", id))?;

    Ok(Thread::new(id, messages))
}

/// Normalize a Gmail API message to a Message
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<Message> {
    let id = MessageId::new(&gmail_msg.id);
    let thread_id = ThreadId::new(&gmail_msg.thread_id);

    let payload = gmail_msg
        .payload
        .as_ref()
        .with_context(|| format!("Message {} has no payload", gmail_msg.id))?;

    // Parse internal date (milliseconds since epoch)
    let internal_date: i64 = gmail_msg
        .internal_date
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);
    let received_at = Utc
        .timestamp_millis_opt(internal_date)
        .single()
        .unwrap_or_else(Utc::now);

    let body_html = extract_html_body(payload);
    let body_text = match extract_plain_text_body(payload) {
        Some(text) => text,
        None => body_html
            .as_deref()
            .map(flatten_html)
            .unwrap_or_default(),
    };

    let mut builder = Message::builder(id, thread_id)
        .from(extract_header(payload, "From").unwrap_or_default())
        .to(extract_header(payload, "To").unwrap_or_default())
        .cc(extract_header(payload, "Cc").unwrap_or_default())
        .subject(extract_header(payload, "Subject").unwrap_or_default())
        .body_text(body_text)
        .body_html(body_html.unwrap_or_default())
        .received_at(received_at)
        .attachments(extract_attachments(payload));

    if let Some(rfc822_id) = extract_header(payload, "Message-ID") {
        builder = builder.rfc822_id(rfc822_id);
    }

    Ok(builder.build())
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

fn is_mime(mime_type: &Option<String>, prefix: &str) -> bool {
    mime_type.as_ref().is_some_and(|m| m.starts_with(prefix))
}

/// A part with a file name is an attachment, never a body
fn is_attachment(filename: &Option<String>) -> bool {
    filename.as_ref().is_some_and(|f| !f.is_empty())
}

/// Extract plain text body from message payload
fn extract_plain_text_body(payload: &MessagePayload) -> Option<String> {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_ref())
        && is_mime(&payload.mime_type, "text/plain")
        && !is_attachment(&payload.filename)
    {
        return decode_base64_body(data);
    }

    find_body_in_parts(payload.parts.as_deref()?, "text/plain")
}

/// Extract HTML body from message payload
fn extract_html_body(payload: &MessagePayload) -> Option<String> {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_ref())
        && is_mime(&payload.mime_type, "text/html")
        && !is_attachment(&payload.filename)
    {
        return decode_base64_body(data);
    }

    find_body_in_parts(payload.parts.as_deref()?, "text/html")
}

/// Recursively search message parts for the first body of a MIME type
fn find_body_in_parts(parts: &[MessagePart], mime_prefix: &str) -> Option<String> {
    for part in parts {
        if is_mime(&part.mime_type, mime_prefix)
            && !is_attachment(&part.filename)
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref())
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }

        if let Some(nested) = &part.parts
            && let Some(text) = find_body_in_parts(nested, mime_prefix)
        {
            return Some(text);
        }
    }

    None
}

/// Collect every named part, including inline images
fn extract_attachments(payload: &MessagePayload) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    if let Some(parts) = &payload.parts {
        collect_attachments(parts, &mut attachments);
    } else if let Some(filename) = payload.filename.as_ref().filter(|f| !f.is_empty()) {
        // Single-part message whose only part is a file
        if let Some(attachment) = to_attachment(filename, &payload.mime_type, payload.body.as_ref()) {
            attachments.push(attachment);
        }
    }
    attachments
}

fn collect_attachments(parts: &[MessagePart], out: &mut Vec<Attachment>) {
    for part in parts {
        if let Some(filename) = part.filename.as_ref().filter(|f| !f.is_empty()) {
            match to_attachment(filename, &part.mime_type, part.body.as_ref()) {
                Some(attachment) => out.push(attachment),
                None => debug!("Skipping attachment {:?} without content", filename),
            }
        }
        if let Some(nested) = &part.parts {
            collect_attachments(nested, out);
        }
    }
}

fn to_attachment(
    filename: &str,
    mime_type: &Option<String>,
    body: Option<&MessageBody>,
) -> Option<Attachment> {
    let body = body?;
    let mime_type = mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if let Some(attachment_id) = &body.attachment_id {
        let size = body.size.unwrap_or(0) as usize;
        return Some(Attachment::remote(filename, mime_type, size, attachment_id));
    }

    let data = decode_base64_bytes(body.data.as_ref()?)?;
    Some(Attachment::inline(filename, mime_type, data))
}

/// Plain-text rendition of an HTML body
fn flatten_html(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| html.to_string())
}

/// Decode base64-encoded bytes
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
pub(crate) fn decode_base64_bytes(data: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders.iter().find_map(|decoder| decoder.decode(data).ok())
}

/// Decode base64-encoded body text, replacing invalid UTF-8
fn decode_base64_body(data: &str) -> Option<String> {
    decode_base64_bytes(data).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::Header;
    use crate::models::AttachmentContent;

    fn encode(s: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(s.as_bytes())
    }

    fn headers(pairs: &[(&str, &str)]) -> Option<Vec<Header>> {
        Some(
            pairs
                .iter()
                .map(|(n, v)| Header {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        )
    }

    fn body(data: Option<String>, attachment_id: Option<&str>) -> Option<MessageBody> {
        Some(MessageBody {
            attachment_id: attachment_id.map(String::from),
            size: Some(42),
            data,
        })
    }

    fn part(mime: &str, filename: &str, body: Option<MessageBody>) -> MessagePart {
        MessagePart {
            part_id: None,
            mime_type: Some(mime.to_string()),
            filename: Some(filename.to_string()),
            headers: None,
            body,
            parts: None,
        }
    }

    fn multipart_message() -> GmailMessage {
        GmailMessage {
            id: "m1".into(),
            thread_id: "t1".into(),
            internal_date: Some("1709283600000".into()),
            payload: Some(MessagePayload {
                headers: headers(&[
                    ("From", "\"Doe, Jane\" <jane@example.com>"),
                    ("To", "bob@example.com, carol@example.com"),
                    ("Subject", "Contract draft"),
                    ("Message-ID", "<abc@mail.example.com>"),
                ]),
                body: None,
                parts: Some(vec![
                    MessagePart {
                        part_id: Some("0".into()),
                        mime_type: Some("multipart/alternative".into()),
                        filename: Some(String::new()),
                        headers: None,
                        body: None,
                        parts: Some(vec![
                            part("text/plain", "", body(Some(encode("Hi Bob")), None)),
                            part("text/html", "", body(Some(encode("<p>Hi Bob</p>")), None)),
                        ]),
                    },
                    part("application/pdf", "draft.pdf", body(None, Some("att-1"))),
                    part("text/plain", "notes.txt", body(Some(encode("note")), None)),
                ]),
                mime_type: Some("multipart/mixed".into()),
                filename: None,
            }),
        }
    }

    #[test]
    fn test_normalize_multipart() {
        let message = normalize_message(multipart_message()).unwrap();

        assert_eq!(message.from, "\"Doe, Jane\" <jane@example.com>");
        assert_eq!(message.to, "bob@example.com, carol@example.com");
        assert_eq!(message.cc, "");
        assert_eq!(message.subject, "Contract draft");
        assert_eq!(message.rfc822_id.as_deref(), Some("<abc@mail.example.com>"));
        assert_eq!(message.body_text, "Hi Bob");
        assert_eq!(message.body_html, "<p>Hi Bob</p>");
        assert_eq!(message.received_at.timestamp_millis(), 1709283600000);
    }

    #[test]
    fn test_attachments_are_not_bodies() {
        let message = normalize_message(multipart_message()).unwrap();

        assert_eq!(message.attachments.len(), 2);
        assert_eq!(message.attachments[0].filename, "draft.pdf");
        assert_eq!(
            message.attachments[0].content,
            AttachmentContent::Remote {
                attachment_id: "att-1".into()
            }
        );
        assert_eq!(message.attachments[1].filename, "notes.txt");
        assert_eq!(
            message.attachments[1].content,
            AttachmentContent::Inline(b"note".to_vec())
        );
    }

    #[test]
    fn test_html_only_message_gets_text_body() {
        let msg = GmailMessage {
            id: "m2".into(),
            thread_id: "t1".into(),
            internal_date: None,
            payload: Some(MessagePayload {
                headers: headers(&[("Subject", "Hello")]),
                body: body(Some(encode("<p>Hello <b>there</b></p>")), None),
                parts: None,
                mime_type: Some("text/html".into()),
                filename: Some(String::new()),
            }),
        };

        let message = normalize_message(msg).unwrap();
        assert!(message.body_text.contains("Hello"));
        assert!(!message.body_text.contains("<p>"));
        assert_eq!(message.body_html, "<p>Hello <b>there</b></p>");
    }

    #[test]
    fn test_message_without_payload_fails() {
        let msg = GmailMessage {
            id: "m3".into(),
            thread_id: "t1".into(),
            internal_date: None,
            payload: None,
        };
        assert!(normalize_message(msg).is_err());
    }

    #[test]
    fn test_empty_thread() {
        let thread = GmailThread {
            id: "t9".into(),
            messages: None,
        };
        assert!(normalize_thread(thread).unwrap().is_none());
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = MessagePayload {
            headers: headers(&[("MESSAGE-ID", "<x@y>")]),
            body: None,
            parts: None,
            mime_type: None,
            filename: None,
        };
        assert_eq!(extract_header(&payload, "Message-ID"), Some("<x@y>".to_string()));
    }

    #[test]
    fn test_decode_base64_body() {
        // "Hello, World!" in base64url
        assert_eq!(
            decode_base64_body("SGVsbG8sIFdvcmxkIQ"),
            Some("Hello, World!".to_string())
        );
    }
}
