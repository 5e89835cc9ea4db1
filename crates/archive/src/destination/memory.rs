//! In-memory destination
//!
//! Used for tests. Folders share one underlying map keyed by full path, so a
//! sub-folder handle sees files written through any other handle.

use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use super::{Destination, StoredFile};

#[derive(Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    folders: BTreeSet<String>,
    failing: BTreeSet<String>,
}

/// In-memory implementation of Destination
#[derive(Clone, Default)]
pub struct InMemoryDestination {
    state: Arc<RwLock<State>>,
    prefix: String,
}

impl InMemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    fn full_path(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Make writes of files with this name fail (in any folder)
    pub fn fail_writes_named(&self, name: &str) {
        self.state.write().unwrap().failing.insert(name.to_string());
    }

    /// Pre-populate a file at a full path (`folder/name` or `name`)
    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.state
            .write()
            .unwrap()
            .files
            .insert(path.to_string(), bytes.to_vec());
    }

    /// Contents of the file at a full path
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().unwrap().files.get(path).cloned()
    }

    /// Full paths of all stored files, sorted
    pub fn paths(&self) -> Vec<String> {
        self.state.read().unwrap().files.keys().cloned().collect()
    }

    /// Full paths of all created folders, sorted
    pub fn folders(&self) -> Vec<String> {
        self.state.read().unwrap().folders.iter().cloned().collect()
    }
}

impl Destination for InMemoryDestination {
    fn create_file(&self, bytes: &[u8], name: &str) -> Result<StoredFile> {
        let path = self.full_path(name);
        let mut state = self.state.write().unwrap();
        if state.failing.contains(name) {
            bail!("write rejected for {}", name);
        }
        if state.files.contains_key(&path) {
            bail!("{} already exists", path);
        }
        state.files.insert(path.clone(), bytes.to_vec());

        Ok(StoredFile {
            id: path.clone(),
            url: format!("memory:///{}", path),
            name: name.to_string(),
        })
    }

    fn file_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .state
            .read()
            .unwrap()
            .files
            .contains_key(&self.full_path(name)))
    }

    fn subfolder(&self, name: &str) -> Result<Box<dyn Destination>> {
        let path = self.full_path(name);
        self.state.write().unwrap().folders.insert(path.clone());
        Ok(Box::new(InMemoryDestination {
            state: Arc::clone(&self.state),
            prefix: format!("{}/", path),
        }))
    }
}
