//! Plain text thread rendering

use super::HEADER_DATE_FORMAT;
use crate::models::Message;

/// Render messages as plain text, one numbered block per message
///
/// ```text
/// ----- Message 1 of 2 -----
/// Date (UTC): 2024-03-01 09:15:00Z
/// From: Alice <alice@example.com>
/// To: bob@example.com
/// Subject: Hello
/// Message-ID: <abc@example.com>
///
/// body...
/// ```
pub fn render_plain(messages: &[Message]) -> String {
    let total = messages.len();
    let mut lines: Vec<String> = Vec::with_capacity(total * 10);

    for (idx, msg) in messages.iter().enumerate() {
        lines.push(format!("----- Message {} of {} -----", idx + 1, total));
        lines.push(format!(
            "Date (UTC): {}",
            msg.received_at.format(HEADER_DATE_FORMAT)
        ));
        lines.push(format!("From: {}", msg.from));
        lines.push(format!("To: {}", msg.to));
        if !msg.cc.trim().is_empty() {
            lines.push(format!("Cc: {}", msg.cc));
        }
        lines.push(format!("Subject: {}", msg.subject));
        lines.push(format!(
            "Message-ID: {}",
            msg.rfc822_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or("(unknown)")
        ));
        lines.push(String::new());
        lines.push(msg.body_text.clone());
        lines.push("\n".to_string());
    }

    lines.join("\n")
}
