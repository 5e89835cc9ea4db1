//! Durable ledger traits

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::models::ThreadId;

/// Value stored for archived threads
const ARCHIVED: &str = "1";

/// Trait for a durable string key-value store
///
/// Writes must be durable when `set` returns: the exporter relies on each
/// mark surviving a crash immediately afterwards.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Trait for the cross-run record of archived threads
pub trait ArchiveLedger: Send + Sync {
    /// Whether the thread was archived (or found pre-existing) by any run
    fn is_archived(&self, id: &ThreadId) -> Result<bool>;

    /// Record the thread as archived
    fn mark_archived(&self, id: &ThreadId) -> Result<()>;
}

/// Archive ledger stored in a key-value store under `<prefix><thread id>`
pub struct KeyValueLedger {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl KeyValueLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Ledger key for a thread
    pub fn key_for(&self, id: &ThreadId) -> String {
        format!("{}{}", self.prefix, id.as_str())
    }
}

impl ArchiveLedger for KeyValueLedger {
    fn is_archived(&self, id: &ThreadId) -> Result<bool> {
        let value = self
            .store
            .get(&self.key_for(id))
            .with_context(|| format!("Failed to read ledger entry for thread {}", id))?;
        Ok(value.as_deref() == Some(ARCHIVED))
    }

    fn mark_archived(&self, id: &ThreadId) -> Result<()> {
        self.store
            .set(&self.key_for(id), ARCHIVED)
            .with_context(|| format!("Failed to record thread {} in ledger", id))
    }
}
