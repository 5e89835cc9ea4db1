//! Run statistics

/// Counters collected over one export run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportStats {
    /// Number of queries attempted
    pub queries_run: usize,
    /// Number of queries abandoned because discovery failed
    pub queries_failed: usize,
    /// Thread IDs returned by all successful queries, duplicates included
    pub threads_discovered: usize,
    /// Thread IDs already handled by an earlier query in this run
    pub duplicates: usize,
    /// Threads archived by this run
    pub exported: usize,
    /// Threads archived before or already present by name
    pub skipped: usize,
    /// Threads that failed and will be retried next run
    pub errors: usize,
    /// Attachments copied (or found already copied)
    pub attachments_captured: usize,
    /// Attachments that could not be copied
    pub attachments_failed: usize,
    /// Duration of the run
    pub duration_ms: u64,
}

impl ExportStats {
    /// Threads that got a log row
    pub fn threads_logged(&self) -> usize {
        self.exported + self.skipped + self.errors
    }
}

impl std::fmt::Display for ExportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} exported, {} skipped, {} errors, {} duplicates across {} queries ({} failed), {} attachments captured ({} failed) in {}ms",
            self.exported,
            self.skipped,
            self.errors,
            self.duplicates,
            self.queries_run,
            self.queries_failed,
            self.attachments_captured,
            self.attachments_failed,
            self.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads_logged() {
        let stats = ExportStats {
            exported: 2,
            skipped: 3,
            errors: 1,
            duplicates: 4,
            ..Default::default()
        };
        assert_eq!(stats.threads_logged(), 6);
    }
}
