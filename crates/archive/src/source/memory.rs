//! In-memory mail source
//!
//! Used for testing and for dry runs. Search results are registered per
//! query; individual queries or threads can be made to fail so error paths
//! can be exercised.

use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::MailSource;
use crate::models::{Message, Thread, ThreadId};

/// In-memory implementation of MailSource
#[derive(Default)]
pub struct InMemoryMailSource {
    results: RwLock<HashMap<String, Vec<ThreadId>>>,
    threads: RwLock<HashMap<ThreadId, Vec<Message>>>,
    failing_queries: RwLock<HashSet<String>>,
    failing_threads: RwLock<HashSet<ThreadId>>,
    search_calls: RwLock<Vec<(String, usize, usize)>>,
}

impl InMemoryMailSource {
    /// Create a new empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a thread's messages, replacing any previous snapshot
    pub fn insert_thread(&self, id: impl Into<ThreadId>, messages: Vec<Message>) {
        self.threads.write().unwrap().insert(id.into(), messages);
    }

    /// Register the ordered search result for a query
    pub fn set_results<I, T>(&self, query: &str, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ThreadId>,
    {
        self.results
            .write()
            .unwrap()
            .insert(query.to_string(), ids.into_iter().map(Into::into).collect());
    }

    /// Make every search page for `query` fail
    pub fn fail_query(&self, query: &str) {
        self.failing_queries
            .write()
            .unwrap()
            .insert(query.to_string());
    }

    /// Make fetching `id` fail
    pub fn fail_thread(&self, id: impl Into<ThreadId>) {
        self.failing_threads.write().unwrap().insert(id.into());
    }

    /// Every `(query, offset, page_size)` search call made so far
    pub fn search_calls(&self) -> Vec<(String, usize, usize)> {
        self.search_calls.read().unwrap().clone()
    }
}

impl MailSource for InMemoryMailSource {
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Vec<ThreadId>> {
        self.search_calls
            .write()
            .unwrap()
            .push((query.to_string(), offset, page_size));

        if self.failing_queries.read().unwrap().contains(query) {
            bail!("search failed for query {:?}", query);
        }

        let results = self.results.read().unwrap();
        Ok(results
            .get(query)
            .map(|ids| ids.iter().skip(offset).take(page_size).cloned().collect())
            .unwrap_or_default())
    }

    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        if self.failing_threads.read().unwrap().contains(id) {
            bail!("thread {} could not be fetched", id);
        }

        let threads = self.threads.read().unwrap();
        Ok(threads
            .get(id)
            .and_then(|messages| Thread::new(id.clone(), messages.clone())))
    }
}
