//! Thread rendering
//!
//! Turns the ordered messages of a thread into either plain text or an HTML
//! document. Both renderers are pure functions of the message sequence.

mod plain;
mod rich;

pub use plain::render_plain;
pub use rich::{escape_html, render_rich};

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Timestamp format used for every rendered message header
pub(crate) const HEADER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Which renderer to use for archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Plain text, converted through an editable draft
    #[default]
    #[serde(rename = "plain", alias = "text", alias = "TEXT")]
    Plain,
    /// HTML with the original rich bodies, converted directly
    #[serde(rename = "rich", alias = "html", alias = "HTML")]
    Rich,
}

impl RenderMode {
    /// Render a thread's messages with this strategy
    pub fn render(self, messages: &[Message]) -> RenderedThread {
        match self {
            RenderMode::Plain => RenderedThread::Text(render_plain(messages)),
            RenderMode::Rich => RenderedThread::Html(render_rich(messages)),
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(RenderMode::Plain),
            "rich" | "html" => Ok(RenderMode::Rich),
            other => Err(format!("unknown render mode '{other}' (expected plain or rich)")),
        }
    }
}

/// Rendered thread content, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedThread {
    Text(String),
    Html(String),
}

impl RenderedThread {
    pub fn as_str(&self) -> &str {
        match self {
            RenderedThread::Text(s) | RenderedThread::Html(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageId, ThreadId};

    #[test]
    fn test_render_mode_selects_variant() {
        let messages = vec![
            Message::builder(MessageId::new("m1"), ThreadId::new("t1"))
                .body_text("hello")
                .build(),
        ];
        assert!(matches!(
            RenderMode::Plain.render(&messages),
            RenderedThread::Text(_)
        ));
        assert!(matches!(
            RenderMode::Rich.render(&messages),
            RenderedThread::Html(_)
        ));
    }

    #[test]
    fn test_render_mode_from_str() {
        assert_eq!("TEXT".parse::<RenderMode>().unwrap(), RenderMode::Plain);
        assert_eq!("rich".parse::<RenderMode>().unwrap(), RenderMode::Rich);
        assert!("pdf".parse::<RenderMode>().is_err());
    }

    #[test]
    fn test_render_mode_serde_aliases() {
        let mode: RenderMode = serde_json::from_str("\"html\"").unwrap();
        assert_eq!(mode, RenderMode::Rich);
        assert_eq!(serde_json::to_string(&RenderMode::Plain).unwrap(), "\"plain\"");
    }
}
