//! Acquisition log
//!
//! One row per thread decision, in processing order. The whole log is
//! serialized to CSV and written once at the end of the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::destination::{Destination, StoredFile};
use crate::models::ThreadId;
use crate::timing::{log_timestamp, run_stamp};

/// CSV header, in column order
pub const CSV_HEADER: [&str; 10] = [
    "query",
    "threadId",
    "filename",
    "fileId",
    "fileUrl",
    "messageCount",
    "attachmentsCount",
    "exportTimestampUTC",
    "status",
    "error",
];

/// Outcome recorded for a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Exported,
    SkipExists,
    Error,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Exported => "EXPORTED",
            ExportStatus::SkipExists => "SKIP_EXISTS",
            ExportStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the acquisition log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub query: String,
    pub thread_id: ThreadId,
    pub filename: String,
    pub file_id: String,
    pub file_url: String,
    pub message_count: Option<usize>,
    pub attachments_count: Option<usize>,
    pub timestamp: DateTime<Utc>,
    pub status: ExportStatus,
    pub error: String,
}

impl LogRow {
    /// Row for a newly archived thread
    pub fn exported(
        query: &str,
        thread_id: &ThreadId,
        file: &StoredFile,
        message_count: usize,
        attachments_count: usize,
    ) -> Self {
        Self {
            query: query.to_string(),
            thread_id: thread_id.clone(),
            filename: file.name.clone(),
            file_id: file.id.clone(),
            file_url: file.url.clone(),
            message_count: Some(message_count),
            attachments_count: Some(attachments_count),
            timestamp: Utc::now(),
            status: ExportStatus::Exported,
            error: String::new(),
        }
    }

    /// Row for a thread archived by an earlier run or already present by name
    ///
    /// The filename and message count are empty when an archived thread can
    /// no longer be loaded.
    pub fn skipped(
        query: &str,
        thread_id: &ThreadId,
        filename: &str,
        message_count: Option<usize>,
    ) -> Self {
        Self {
            query: query.to_string(),
            thread_id: thread_id.clone(),
            filename: filename.to_string(),
            file_id: String::new(),
            file_url: String::new(),
            message_count,
            attachments_count: None,
            timestamp: Utc::now(),
            status: ExportStatus::SkipExists,
            error: String::new(),
        }
    }

    /// Row for a thread that failed; `error` must describe the failure
    pub fn error(query: &str, thread_id: &ThreadId, error: impl std::fmt::Display) -> Self {
        Self {
            query: query.to_string(),
            thread_id: thread_id.clone(),
            filename: String::new(),
            file_id: String::new(),
            file_url: String::new(),
            message_count: None,
            attachments_count: None,
            timestamp: Utc::now(),
            status: ExportStatus::Error,
            error: error.to_string(),
        }
    }

    fn fields(&self) -> [String; 10] {
        let count = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_default();
        [
            self.query.clone(),
            self.thread_id.to_string(),
            self.filename.clone(),
            self.file_id.clone(),
            self.file_url.clone(),
            count(self.message_count),
            count(self.attachments_count),
            log_timestamp(self.timestamp),
            self.status.as_str().to_string(),
            self.error.clone(),
        ]
    }
}

/// Rows accumulated during one run
#[derive(Debug, Clone)]
pub struct AcquisitionLog {
    started_at: DateTime<Utc>,
    rows: Vec<LogRow>,
}

impl AcquisitionLog {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: LogRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Name of this run's log file, e.g. `acquisition_log_20240301_081500Z.csv`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}{}.csv", prefix, run_stamp(self.started_at))
    }

    fn available_name(&self, destination: &dyn Destination, prefix: &str) -> Result<String> {
        let mut name = self.file_name(prefix);
        let mut n = 2;
        while destination.file_exists(&name)? {
            name = format!("{}{}_{}.csv", prefix, run_stamp(self.started_at), n);
            n += 1;
        }
        Ok(name)
    }

    /// Header plus one line per row, joined by `\n`
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(CSV_HEADER.join(","));
        for row in &self.rows {
            let fields = row.fields();
            let escaped: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
            lines.push(escaped.join(","));
        }
        lines.join("\n")
    }

    /// Write the log to `destination` as a single new file
    ///
    /// Earlier logs are never overwritten: if a run started in the same
    /// second already left a log, a `_2`, `_3`, ... suffix is added.
    pub fn persist(&self, destination: &dyn Destination, prefix: &str) -> Result<StoredFile> {
        let name = self.available_name(destination, prefix)?;
        destination
            .create_file(self.to_csv().as_bytes(), &name)
            .with_context(|| format!("Failed to write acquisition log {}", name))
    }
}

/// Quote a CSV field if it contains a delimiter, quote or line break
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
