//! Archive destinations
//!
//! Where archive documents, attachment copies and run logs end up. The
//! exporter only talks to the [`Destination`] trait.

mod filesystem;
mod memory;
mod traits;

pub use filesystem::FsDestination;
pub use memory::InMemoryDestination;
pub use traits::{Destination, StoredFile};
