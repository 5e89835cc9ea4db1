//! Local directory destination

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use url::Url;

use super::{Destination, StoredFile};

/// Destination backed by a local directory tree
///
/// Files are written atomically (temp file, then rename) and never
/// overwritten.
pub struct FsDestination {
    root: PathBuf,
}

impl FsDestination {
    /// Open the folder at `root`, creating it if needed
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create destination directory {:?}", root))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve destination directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside this folder, rejecting anything that would escape it
    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            bail!("invalid file name {:?}", name);
        }
        Ok(self.root.join(name))
    }
}

impl Destination for FsDestination {
    fn create_file(&self, bytes: &[u8], name: &str) -> Result<StoredFile> {
        let path = self.entry_path(name)?;
        if path.exists() {
            bail!("{:?} already exists", path);
        }

        // Write atomically (write to temp, then rename)
        let temp_path = self.root.join(format!(".{}.tmp", name));
        fs::write(&temp_path, bytes)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| format!("Failed to move file into place at {:?}", path));
        }

        let url = Url::from_file_path(&path)
            .map_err(|_| anyhow!("cannot build a file URL for {:?}", path))?;

        Ok(StoredFile {
            id: path.to_string_lossy().into_owned(),
            url: url.to_string(),
            name: name.to_string(),
        })
    }

    fn file_exists(&self, name: &str) -> Result<bool> {
        Ok(self.entry_path(name)?.is_file())
    }

    fn subfolder(&self, name: &str) -> Result<Box<dyn Destination>> {
        let path = self.entry_path(name)?;
        Ok(Box::new(FsDestination::new(path)?))
    }
}
