//! HTML thread rendering

use super::HEADER_DATE_FORMAT;
use crate::models::Message;

/// Render messages as a single HTML document
///
/// Header values are escaped. Rich bodies come from the mail store and are
/// embedded as-is; messages without one fall back to their escaped plain
/// body in a `<pre>` block.
pub fn render_rich(messages: &[Message]) -> String {
    let blocks: Vec<String> = messages.iter().map(render_block).collect();

    format!(
        "<html><head><meta charset=\"UTF-8\"></head><body>{}</body></html>",
        blocks.join("\n")
    )
}

fn render_block(msg: &Message) -> String {
    // Rich headers keep a fixed shape: Cc is printed even when empty
    let header = [
        format!(
            "<b>Date (UTC):</b> {}",
            msg.received_at.format(HEADER_DATE_FORMAT)
        ),
        format!("<b>From:</b> {}", escape_html(&msg.from)),
        format!("<b>To:</b> {}", escape_html(&msg.to)),
        format!("<b>Cc:</b> {}", escape_html(&msg.cc)),
        format!("<b>Subject:</b> {}", escape_html(&msg.subject)),
        format!(
            "<b>Message-ID:</b> {}",
            escape_html(msg.rfc822_id.as_deref().unwrap_or(""))
        ),
    ];

    let body = if msg.body_html.trim().is_empty() {
        format!("<pre>{}</pre>", escape_html(&msg.body_text))
    } else {
        msg.body_html.clone()
    };

    format!(
        "<hr><div>{}<div style=\"margin-top:6px\">{}</div></div>",
        header.join("<br/>"),
        body
    )
}

/// Escape text for safe inclusion in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageId, ThreadId};
    use chrono::{TimeZone, Utc};

    fn message(id: &str) -> Message {
        Message::builder(MessageId::new(id), ThreadId::new("t1"))
            .rfc822_id(format!("<{id}@example.com>"))
            .from("Alice <alice@example.com>")
            .to("bob@example.com")
            .subject("Q&A")
            .body_text("plain <text>")
            .body_html("<p>Hello <b>Bob</b></p>")
            .received_at(Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap())
            .build()
    }

    #[test]
    fn test_headers_escaped_and_bolded() {
        let html = render_rich(&[message("m1")]);
        assert!(html.starts_with("<html><head><meta charset=\"UTF-8\"></head><body><hr><div>"));
        assert!(html.contains("<b>Date (UTC):</b> 2024-03-01 08:15:00Z"));
        assert!(html.contains("<b>From:</b> Alice &lt;alice@example.com&gt;"));
        assert!(html.contains("<b>Subject:</b> Q&amp;A"));
        assert!(html.contains("<b>Message-ID:</b> &lt;m1@example.com&gt;"));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_cc_line_always_present() {
        let html = render_rich(&[message("m1")]);
        assert!(html.contains("<b>To:</b> bob@example.com<br/><b>Cc:</b> <br/><b>Subject:</b>"));

        let with_cc = Message {
            cc: "Carol <carol@example.com>".to_string(),
            ..message("m2")
        };
        let html = render_rich(&[with_cc]);
        assert!(html.contains("<b>Cc:</b> Carol &lt;carol@example.com&gt;<br/>"));
    }

    #[test]
    fn test_rich_body_embedded_unescaped() {
        let html = render_rich(&[message("m1")]);
        assert!(html.contains("<div style=\"margin-top:6px\"><p>Hello <b>Bob</b></p></div>"));
    }

    #[test]
    fn test_plain_fallback_when_no_rich_body() {
        let msg = Message::builder(MessageId::new("m1"), ThreadId::new("t1"))
            .body_text("a < b")
            .build();
        let html = render_rich(&[msg]);
        assert!(html.contains("<pre>a &lt; b</pre>"));
    }

    #[test]
    fn test_one_rule_per_message() {
        let html = render_rich(&[message("m1"), message("m2"), message("m3")]);
        assert_eq!(html.matches("<hr>").count(), 3);
        assert!(html.find("m1@example").unwrap() < html.find("m3@example").unwrap());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
