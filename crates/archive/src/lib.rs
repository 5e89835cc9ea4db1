//! Archive crate - Business logic for exporting mail threads
//!
//! This crate turns the threads matched by an ordered list of mail searches
//! into one PDF archive per thread, including:
//! - Domain models (Thread, Message, Attachment)
//! - Gmail API client and OAuth authentication
//! - Paginated thread discovery
//! - Two-tier deduplication (per run and across runs)
//! - Deterministic, sanitized archive naming
//! - Plain-text and HTML rendering, PDF conversion
//! - A per-run CSV acquisition log
//! - Query generation from case seeds
//!
//! Every run is idempotent: a thread archived once is never archived again.

pub mod acquisition;
pub mod config;
pub mod convert;
pub mod destination;
pub mod discovery;
pub mod error;
pub mod export;
pub mod gmail;
pub mod ledger;
pub mod models;
pub mod naming;
pub mod queries;
pub mod render;
pub mod source;
pub mod timing;

pub use crate::acquisition::{AcquisitionLog, ExportStatus, LogRow};
pub use crate::config::{ExportConfig, GmailCredentials};
pub use crate::convert::{ConversionBackend, Document, DocumentConverter, DraftGuard, DraftId, LocalPdfBackend};
pub use crate::destination::{Destination, FsDestination, InMemoryDestination, StoredFile};
pub use crate::discovery::{DiscoveryOptions, ThreadDiscoverer};
pub use crate::error::ExportError;
pub use crate::export::{ExportReport, ExportStats, Exporter};
pub use crate::gmail::{GmailAuth, GmailClient};
pub use crate::ledger::{
    ArchiveLedger, InMemoryKeyValueStore, KeyValueLedger, KeyValueStore, RunLedger,
    SqliteKeyValueStore,
};
pub use crate::models::{Attachment, AttachmentContent, EmailAddress, Message, MessageId, Thread, ThreadId};
pub use crate::naming::{ArchiveName, NamingOptions, name_for, sanitize_filename};
pub use crate::queries::{CaseSeed, QuerySet, build_queries};
pub use crate::render::{RenderMode, RenderedThread};
pub use crate::source::{InMemoryMailSource, MailSource};
pub use crate::timing::Throttle;
