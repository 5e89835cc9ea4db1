//! Deduplication ledgers
//!
//! Two tiers with different lifetimes:
//! - [`RunLedger`]: in-memory set of threads already seen in this run, so a
//!   thread matched by several queries is handled once
//! - [`ArchiveLedger`]: durable record of archived threads, so repeated runs
//!   never export a thread twice
//!
//! The durable tier sits on a [`KeyValueStore`], which can be swapped
//! (SQLite file, in-memory) without touching the exporter.

mod memory;
mod run;
mod sqlite;
mod traits;

pub use memory::InMemoryKeyValueStore;
pub use run::RunLedger;
pub use sqlite::SqliteKeyValueStore;
pub use traits::{ArchiveLedger, KeyValueLedger, KeyValueStore};
