//! Thread discovery
//!
//! Pages through a mail source's search results for one query.

use log::debug;

use crate::error::{ExportError, Result};
use crate::models::ThreadId;
use crate::source::MailSource;
use crate::timing::Throttle;

/// Paging limits for discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Maximum number of thread IDs returned per query
    pub max_results: usize,
    /// Number of thread IDs requested per page
    pub page_size: usize,
}

/// Paginated search for the threads matching one query
pub struct ThreadDiscoverer<'a> {
    source: &'a dyn MailSource,
    options: DiscoveryOptions,
    throttle: Throttle,
}

impl<'a> ThreadDiscoverer<'a> {
    pub fn new(source: &'a dyn MailSource, options: DiscoveryOptions, throttle: Throttle) -> Self {
        Self {
            source,
            options,
            throttle,
        }
    }

    /// Collect the ordered thread IDs matching `query`
    ///
    /// Stops at the first short page or once `max_results` IDs are
    /// collected, pausing between pages. Each page is requested once; a
    /// failed page fails the whole query rather than returning a partial
    /// list.
    pub fn discover(&self, query: &str) -> Result<Vec<ThreadId>> {
        let mut ids: Vec<ThreadId> = Vec::new();
        let page_size = self.options.page_size.max(1);

        while ids.len() < self.options.max_results {
            let requested = page_size.min(self.options.max_results - ids.len());
            let batch = self
                .source
                .search(query, ids.len(), requested)
                .map_err(|e| ExportError::discovery(query, e))?;

            let received = batch.len();
            debug!(
                "Query {:?}: page at offset {} returned {} threads",
                query,
                ids.len(),
                received
            );
            ids.extend(batch.into_iter().take(requested));

            if received < requested || ids.len() >= self.options.max_results {
                break;
            }
            self.throttle.pause();
        }

        Ok(ids)
    }
}
