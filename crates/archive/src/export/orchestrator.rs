//! Export orchestrator
//!
//! Per thread, the decision runs:
//! - already handled by an earlier query in this run: dropped, no row
//! - archived by an earlier run: SKIP_EXISTS row, even when the thread can
//!   no longer be loaded
//! - a file with the same name exists: SKIP_EXISTS row, ledger mark
//! - otherwise render, convert, store, copy attachments: EXPORTED row,
//!   ledger mark
//! - any failure on the way: ERROR row, no ledger mark (retried next run)
//!
//! Ledger failures are the only ones that stop the run.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::time::Instant;

use super::ExportStats;
use crate::acquisition::{AcquisitionLog, LogRow};
use crate::config::ExportConfig;
use crate::convert::{ConversionBackend, DocumentConverter};
use crate::destination::{Destination, StoredFile};
use crate::discovery::{DiscoveryOptions, ThreadDiscoverer};
use crate::error::{ExportError, Result};
use crate::ledger::{ArchiveLedger, RunLedger};
use crate::models::{Attachment, Message, Thread, ThreadId};
use crate::naming::{attachment_name, name_for, sanitize_filename};
use crate::source::MailSource;
use crate::timing::Throttle;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub stats: ExportStats,
    /// Every row written to the acquisition log
    pub log: AcquisitionLog,
    /// Where the acquisition log was stored
    pub log_file: StoredFile,
}

/// Wires the collaborators of one export run together
pub struct Exporter<'a> {
    config: &'a ExportConfig,
    source: &'a dyn MailSource,
    ledger: &'a dyn ArchiveLedger,
    destination: &'a dyn Destination,
    backend: &'a dyn ConversionBackend,
}

impl<'a> Exporter<'a> {
    pub fn new(
        config: &'a ExportConfig,
        source: &'a dyn MailSource,
        ledger: &'a dyn ArchiveLedger,
        destination: &'a dyn Destination,
        backend: &'a dyn ConversionBackend,
    ) -> Self {
        Self {
            config,
            source,
            ledger,
            destination,
            backend,
        }
    }

    /// Run every query in order and persist the acquisition log
    ///
    /// Returns `Err` only for persistence failures. The rows gathered up to
    /// that point are still written to the log before returning.
    pub fn run(&self) -> Result<ExportReport> {
        let start = Instant::now();
        let mut log = AcquisitionLog::new(Utc::now());
        let mut seen = RunLedger::new();
        let mut stats = ExportStats::default();

        let throttle = Throttle::new(self.config.delay());
        let discoverer = ThreadDiscoverer::new(
            self.source,
            DiscoveryOptions {
                max_results: self.config.max_per_query,
                page_size: self.config.page_size,
            },
            throttle,
        );

        for query in &self.config.queries {
            stats.queries_run += 1;
            info!("Running query {:?}", query);

            let ids = match discoverer.discover(query) {
                Ok(ids) => ids,
                Err(e) => {
                    error!("{}", e);
                    stats.queries_failed += 1;
                    continue;
                }
            };
            info!("Query {:?} matched {} threads", query, ids.len());
            stats.threads_discovered += ids.len();

            for id in ids {
                if !seen.mark_seen_this_run(&id) {
                    debug!("Thread {} already handled this run", id);
                    stats.duplicates += 1;
                    continue;
                }

                match self.process_thread(query, &id, &throttle, &mut stats) {
                    Ok(row) => log.push(row),
                    Err(e) if e.is_fatal() => {
                        error!("Aborting run at thread {}: {}", id, e);
                        stats.errors += 1;
                        log.push(LogRow::error(query, &id, &e));
                        if let Err(log_err) = log.persist(self.destination, &self.config.log_file_prefix) {
                            warn!("Acquisition log of aborted run not written: {:#}", log_err);
                        }
                        return Err(e);
                    }
                    Err(e) => {
                        error!("Thread {}: {}", id, e);
                        stats.errors += 1;
                        log.push(LogRow::error(query, &id, &e));
                    }
                }
            }
        }

        let log_file = log
            .persist(self.destination, &self.config.log_file_prefix)
            .map_err(ExportError::persistence)?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!("Run complete: {}", stats);
        info!("Acquisition log written to {}", log_file.url);

        Ok(ExportReport {
            stats,
            log,
            log_file,
        })
    }

    /// Decide and carry out what happens to one thread
    fn process_thread(
        &self,
        query: &str,
        id: &ThreadId,
        throttle: &Throttle,
        stats: &mut ExportStats,
    ) -> Result<LogRow> {
        let archived = self
            .ledger
            .is_archived(id)
            .map_err(ExportError::persistence)?;

        if archived {
            debug!("Thread {} skipped (in ledger)", id);
            stats.skipped += 1;
            return Ok(self.archived_row(query, id));
        }

        let thread = match self.source.get_thread(id) {
            Ok(Some(thread)) => thread,
            Ok(None) => return Err(ExportError::fetch(id, "thread not found or has no messages")),
            Err(e) => return Err(ExportError::fetch(id, format!("{e:#}"))),
        };

        let name = name_for(&thread, &self.config.naming());

        let exists = self
            .destination
            .file_exists(&name.file_name)
            .map_err(|e| ExportError::destination(&name.file_name, e))?;
        if exists {
            debug!("Thread {} skipped (file exists)", id);
            self.ledger
                .mark_archived(id)
                .map_err(ExportError::persistence)?;
            stats.skipped += 1;
            return Ok(LogRow::skipped(
                query,
                id,
                &name.file_name,
                Some(thread.message_count()),
            ));
        }

        let rendered = self.config.render_mode.render(thread.messages());
        let document = DocumentConverter::new(self.backend)
            .to_document(&rendered, &name.file_name)
            .map_err(ExportError::conversion)?;

        let stored = self
            .destination
            .create_file(&document.bytes, &document.name)
            .map_err(|e| ExportError::destination(&document.name, e))?;

        let attachments = if self.config.save_attachments {
            self.capture_attachments(&thread, &name.stem, stats)
        } else {
            0
        };

        self.ledger
            .mark_archived(id)
            .map_err(ExportError::persistence)?;
        stats.exported += 1;
        debug!("Thread {} exported as {}", id, stored.name);

        throttle.pause();

        Ok(LogRow::exported(
            query,
            id,
            &stored,
            thread.message_count(),
            attachments,
        ))
    }

    /// SKIP_EXISTS row for a thread the ledger already holds
    ///
    /// The thread is only loaded to fill in its name and size; a thread that
    /// can no longer be loaded is still reported as skipped.
    fn archived_row(&self, query: &str, id: &ThreadId) -> LogRow {
        match self.source.get_thread(id) {
            Ok(Some(thread)) => {
                let name = name_for(&thread, &self.config.naming());
                LogRow::skipped(query, id, &name.file_name, Some(thread.message_count()))
            }
            Ok(None) => LogRow::skipped(query, id, "", None),
            Err(e) => {
                debug!("Archived thread {} could not be loaded: {:#}", id, e);
                LogRow::skipped(query, id, "", None)
            }
        }
    }

    /// Copy every attachment of the thread into its sub-folder
    ///
    /// Best-effort: failures are logged and counted, never returned.
    fn capture_attachments(&self, thread: &Thread, stem: &str, stats: &mut ExportStats) -> usize {
        let total = thread.attachment_count();
        if total == 0 {
            return 0;
        }

        let max_len = self.config.max_filename_len;
        let folder_name = sanitize_filename(
            &format!("{}{}", stem, self.config.attachment_folder_suffix),
            max_len,
        );
        let folder = match self.destination.subfolder(&folder_name) {
            Ok(folder) => folder,
            Err(e) => {
                warn!("{}", ExportError::attachment(&folder_name, e));
                stats.attachments_failed += total;
                return 0;
            }
        };

        let mut captured = 0;
        for message in thread.messages() {
            for (index, attachment) in message.attachments.iter().enumerate() {
                let name = attachment_name(stem, message, index, &attachment.filename, max_len);
                let result = copy_attachment(self.source, folder.as_ref(), message, attachment, &name);
                match result {
                    Ok(()) => captured += 1,
                    Err(e) => {
                        warn!("{}", ExportError::attachment(&name, e));
                        stats.attachments_failed += 1;
                    }
                }
            }
        }

        stats.attachments_captured += captured;
        captured
    }
}

fn copy_attachment(
    source: &dyn MailSource,
    folder: &dyn Destination,
    message: &Message,
    attachment: &Attachment,
    name: &str,
) -> anyhow::Result<()> {
    if folder.file_exists(name)? {
        debug!("Attachment {} already present", name);
        return Ok(());
    }
    let data = source.attachment_data(message, attachment)?;
    folder.create_file(&data, name)?;
    Ok(())
}
