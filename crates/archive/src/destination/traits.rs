//! Destination trait

use anyhow::Result;

/// A file written to a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Destination-specific identifier
    pub id: String,
    /// Link to the stored file
    pub url: String,
    /// File name within its folder
    pub name: String,
}

/// Trait for a folder that archive files are written into
pub trait Destination: Send + Sync {
    /// Write a new file named `name` into this folder
    fn create_file(&self, bytes: &[u8], name: &str) -> Result<StoredFile>;

    /// Whether a file with exactly this name exists in this folder
    fn file_exists(&self, name: &str) -> Result<bool>;

    /// Get or create the named sub-folder
    fn subfolder(&self, name: &str) -> Result<Box<dyn Destination>>;
}
