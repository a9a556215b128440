use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::dataset::StudyDataset;
use crate::domain::{StudyKind, StudyName};
use crate::error::ScopeError;
use crate::studies::StudyClient;

/// Session-scoped memoization of fetched studies.
///
/// Keyed by (name, kind); invalidation is explicit, there is no TTL. The
/// cache lives exactly as long as the caller keeps it, which for the CLI is
/// one invocation and for library users whatever session they choose.
#[derive(Debug, Default)]
pub struct StudyCache {
    entries: HashMap<(StudyName, StudyKind), StudyDataset>,
    fetches: u64,
    hits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub fetches: u64,
    pub hits: u64,
}

impl StudyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset or fetch, reshape, and memoize it.
    pub fn get_or_fetch(
        &mut self,
        client: &dyn StudyClient,
        name: &StudyName,
        kind: StudyKind,
    ) -> Result<StudyDataset, ScopeError> {
        let key = (name.clone(), kind);
        if let Some(dataset) = self.entries.get(&key) {
            self.hits += 1;
            debug!(study = %name, %kind, "study cache hit");
            return Ok(dataset.clone());
        }
        self.fetches += 1;
        let file = client.fetch_study(name, kind)?;
        let dataset = StudyDataset::from_file(name.as_str(), file)?;
        self.entries.insert(key, dataset.clone());
        Ok(dataset)
    }

    pub fn invalidate(&mut self, name: &StudyName, kind: StudyKind) {
        self.entries.remove(&(name.clone(), kind));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fetches: self.fetches,
            hits: self.hits,
        }
    }
}
