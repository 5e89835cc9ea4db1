//! Error taxonomy for the export pipeline
//!
//! Collaborators (mail source, ledger store, destination, conversion
//! backend) report failures as `anyhow::Error`. The exporter classifies each
//! failure by the stage it happened in, which decides whether the run
//! continues.

use crate::models::ThreadId;

/// A classified export failure
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A search page could not be fetched; the query is abandoned
    #[error("discovery failed for query {query:?}: {source:#}")]
    Discovery {
        query: String,
        #[source]
        source: anyhow::Error,
    },

    /// The thread could not be loaded from the mail store
    #[error("failed to load thread {thread_id}: {message}")]
    Fetch { thread_id: ThreadId, message: String },

    /// Rendering or document conversion failed
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The archive document could not be written to the destination
    #[error("failed to store archive {name}: {message}")]
    Destination { name: String, message: String },

    /// An attachment could not be copied (best-effort, never fatal)
    #[error("attachment {name} not captured: {message}")]
    Attachment { name: String, message: String },

    /// The ledger or run log could not be persisted; aborts the run
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ExportError {
    pub fn discovery(query: &str, source: anyhow::Error) -> Self {
        Self::Discovery {
            query: query.to_string(),
            source,
        }
    }

    pub fn fetch(thread_id: &ThreadId, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            thread_id: thread_id.clone(),
            message: err.to_string(),
        }
    }

    /// Build a conversion error, keeping the full `anyhow` context chain
    pub fn conversion(err: anyhow::Error) -> Self {
        Self::Conversion(format!("{err:#}"))
    }

    pub fn destination(name: &str, err: anyhow::Error) -> Self {
        Self::Destination {
            name: name.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub fn attachment(name: &str, err: anyhow::Error) -> Self {
        Self::Attachment {
            name: name.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    /// Whether this error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
