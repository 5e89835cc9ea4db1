//! Document conversion
//!
//! Turns rendered thread content into a PDF [`Document`]. Plain text goes
//! through a transient editable draft in the backend, which is always
//! discarded afterwards; markup is converted directly.

mod local;
mod pdf;

pub use local::LocalPdfBackend;
pub use pdf::text_to_pdf;

use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;

use crate::render::RenderedThread;

/// MIME type of converted archives
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Identifier of a transient draft in a conversion backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftId(pub String);

/// Trait for a backend that can produce PDFs
pub trait ConversionBackend: Send + Sync {
    /// Create an editable draft holding `text`
    fn create_draft(&self, title: &str, text: &str) -> Result<DraftId>;

    /// Export a draft as PDF bytes
    fn export_pdf(&self, draft: &DraftId) -> Result<Vec<u8>>;

    /// Remove a draft
    fn discard_draft(&self, draft: &DraftId) -> Result<()>;

    /// Convert an HTML document straight to PDF bytes
    fn markup_to_pdf(&self, markup: &str) -> Result<Vec<u8>>;
}

/// Discards a draft when dropped, whatever happened in between
pub struct DraftGuard<'a> {
    backend: &'a dyn ConversionBackend,
    draft: DraftId,
}

impl<'a> DraftGuard<'a> {
    pub fn new(backend: &'a dyn ConversionBackend, draft: DraftId) -> Self {
        Self { backend, draft }
    }

    pub fn id(&self) -> &DraftId {
        &self.draft
    }
}

impl Drop for DraftGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.discard_draft(&self.draft) {
            warn!("Failed to discard draft {}: {:#}", self.draft.0, e);
        }
    }
}

/// A converted, named document ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Document {
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            name: String::new(),
            bytes,
            mime_type: PDF_MIME_TYPE.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Converts rendered threads into named PDF documents
pub struct DocumentConverter<'a> {
    backend: &'a dyn ConversionBackend,
}

impl<'a> DocumentConverter<'a> {
    pub fn new(backend: &'a dyn ConversionBackend) -> Self {
        Self { backend }
    }

    /// Convert `content` to a PDF named `name`
    pub fn to_document(&self, content: &RenderedThread, name: &str) -> Result<Document> {
        let bytes = match content {
            RenderedThread::Text(text) => {
                let title = format!("TMP_{}", Utc::now().timestamp_millis());
                let draft = self
                    .backend
                    .create_draft(&title, text)
                    .context("Failed to create conversion draft")?;
                let guard = DraftGuard::new(self.backend, draft);
                self.backend
                    .export_pdf(guard.id())
                    .context("Failed to export draft as PDF")?
            }
            RenderedThread::Html(markup) => self
                .backend
                .markup_to_pdf(markup)
                .context("Failed to convert markup to PDF")?,
        };

        Ok(Document::pdf(bytes).with_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;

    /// Records every backend call; optionally fails exports
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        fail_export: bool,
        fail_discard: bool,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ConversionBackend for RecordingBackend {
        fn create_draft(&self, _title: &str, text: &str) -> Result<DraftId> {
            self.calls.lock().unwrap().push(format!("create:{text}"));
            Ok(DraftId("d1".to_string()))
        }

        fn export_pdf(&self, draft: &DraftId) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("export:{}", draft.0));
            if self.fail_export {
                bail!("export quota exceeded");
            }
            Ok(b"%PDF-text".to_vec())
        }

        fn discard_draft(&self, draft: &DraftId) -> Result<()> {
            self.calls.lock().unwrap().push(format!("discard:{}", draft.0));
            if self.fail_discard {
                bail!("trash unavailable");
            }
            Ok(())
        }

        fn markup_to_pdf(&self, _markup: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push("markup".to_string());
            Ok(b"%PDF-html".to_vec())
        }
    }

    #[test]
    fn test_text_goes_through_draft() {
        let backend = RecordingBackend::default();
        let converter = DocumentConverter::new(&backend);

        let doc = converter
            .to_document(&RenderedThread::Text("hello".into()), "a.pdf")
            .unwrap();

        assert_eq!(doc.name, "a.pdf");
        assert_eq!(doc.bytes, b"%PDF-text");
        assert_eq!(doc.mime_type, PDF_MIME_TYPE);
        assert_eq!(backend.calls(), vec!["create:hello", "export:d1", "discard:d1"]);
    }

    #[test]
    fn test_draft_discarded_on_failure() {
        let backend = RecordingBackend {
            fail_export: true,
            ..Default::default()
        };
        let converter = DocumentConverter::new(&backend);

        let err = converter
            .to_document(&RenderedThread::Text("hello".into()), "a.pdf")
            .unwrap_err();

        assert!(format!("{err:#}").contains("export quota exceeded"));
        assert_eq!(backend.calls().last().unwrap(), "discard:d1");
    }

    #[test]
    fn test_discard_failure_does_not_fail_conversion() {
        let backend = RecordingBackend {
            fail_discard: true,
            ..Default::default()
        };
        let converter = DocumentConverter::new(&backend);

        let doc = converter
            .to_document(&RenderedThread::Text("hello".into()), "a.pdf")
            .unwrap();
        assert_eq!(doc.bytes, b"%PDF-text");
    }

    #[test]
    fn test_markup_converted_directly() {
        let backend = RecordingBackend::default();
        let converter = DocumentConverter::new(&backend);

        let doc = converter
            .to_document(&RenderedThread::Html("<p>x</p>".into()), "b.pdf")
            .unwrap();

        assert_eq!(doc.bytes, b"%PDF-html");
        assert_eq!(backend.calls(), vec!["markup"]);
    }
}
