//! Mail source abstraction
//!
//! The exporter only needs three things from a mail store: paginated thread
//! search, full thread retrieval and attachment download. The trait-based
//! design allows swapping the Gmail client for an in-memory source in tests.

mod memory;
mod traits;

pub use memory::InMemoryMailSource;
pub use traits::MailSource;
