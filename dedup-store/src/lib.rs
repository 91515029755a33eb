//! Persisted record of post identifiers that have already been examined.
//!
//! Identifiers are kept in discovery order. Once the set grows past
//! [`CAPACITY_THRESHOLD`], the oldest [`EVICTION_BATCH`] entries are dropped
//! in one block. The backing file is a pretty-printed JSON array, rewritten
//! whole on every save.

use clip_core::{log_channels, CoreError};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CAPACITY_THRESHOLD: usize = 1100;
pub const EVICTION_BATCH: usize = 100;

#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    ids: VecDeque<String>,
    index: HashSet<String>,
}

impl DedupStore {
    /// An empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    /// Loads the store from `path`. A missing or empty file means no history.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let mut store = Self::new(path);

        let contents = match tokio::fs::read_to_string(&store.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target: log_channels::SESSION,
                    "No dedup history at {}, starting empty",
                    store.path.display()
                );
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(store);
        }

        let ids: Vec<String> = serde_json::from_str(&contents)?;
        for id in ids {
            store.add(id);
        }
        info!(
            target: log_channels::SESSION,
            "Loaded {} checked posts from {}",
            store.len(),
            store.path.display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Appends `id` unless it is already present. Returns whether it was added.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.ids.push_back(id);
        true
    }

    /// Drops the oldest block of entries while the store is over capacity.
    /// Returns how many identifiers were evicted.
    pub fn evict_if_over_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.ids.len() > CAPACITY_THRESHOLD {
            let batch = EVICTION_BATCH.min(self.ids.len());
            for id in self.ids.drain(..batch) {
                self.index.remove(&id);
            }
            evicted += batch;
        }
        if evicted > 0 {
            debug!(
                target: log_channels::SESSION,
                "Evicted {} oldest checked posts, {} remain",
                evicted,
                self.ids.len()
            );
        }
        evicted
    }

    /// Applies eviction, then rewrites the backing file.
    pub async fn persist(&mut self) -> Result<(), CoreError> {
        self.evict_if_over_capacity();
        let ids: Vec<&String> = self.ids.iter().collect();
        let rendered = serde_json::to_string_pretty(&ids)?;
        tokio::fs::write(&self.path, rendered).await?;
        debug!(
            target: log_channels::SESSION,
            "Persisted {} checked posts to {}",
            self.ids.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in insertion order, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
