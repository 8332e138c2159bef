//! deduplicating parameter set registry
//!
//! Every table inside a [ParameterSet] is stored by id, the registry maps those ids back to the
//! parameter sets. One process wide instance is available via [ParameterSetRegistry::global],
//! separate instances can be created for isolated use. Nested tables always live in the global
//! registry: a separate instance exports them along with its own entries, and rows it imports
//! are made available to the global registry as well.
//!
//! All operations are serialized by one re-entrant lock. Re-entrancy is needed because
//! computing an id or parsing a stored blob may itself look up or register nested tables.
//!
//! Besides the in-memory map the registry has a lazily opened in-memory SQLite database (the
//! "primary store"). [ParameterSetRegistry::import_from] merges rows of another store into it,
//! lookups that miss in memory fall back to it, [ParameterSetRegistry::stage_in] loads all of its
//! rows into memory and [ParameterSetRegistry::export_to] writes everything to another store.
use crate::error::{Error, Result};
use crate::id::ParameterSetId;
use crate::store::{self, BlobStore};
use crate::ParameterSet;
use once_cell::sync::Lazy;
use parking_lot::ReentrantMutex;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

static GLOBAL: Lazy<ParameterSetRegistry> = Lazy::new(ParameterSetRegistry::new);

#[derive(Default)]
struct Inner {
    sets: HashMap<ParameterSetId, Arc<ParameterSet>>,
    primary: Option<Connection>,
}

impl Inner {
    fn primary(&mut self) -> Result<&Connection> {
        if self.primary.is_none() {
            let connection = store::open_in_memory()?;
            connection.ensure_schema()?;
            self.primary = Some(connection);
        }
        match &self.primary {
            Some(connection) => Ok(connection),
            None => Err(Error::CantOpenDb("primary store".into())),
        }
    }
}

pub struct ParameterSetRegistry {
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl Default for ParameterSetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterSetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterSetRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl ParameterSetRegistry {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner::default())),
        }
    }

    /// Process wide registry
    pub fn global() -> &'static ParameterSetRegistry {
        &GLOBAL
    }

    fn is_global(&self) -> bool {
        std::ptr::eq(self, Self::global())
    }

    /// Register `pset`, returns its id
    ///
    /// Registering content that is already present keeps the existing entry.
    pub fn put(&self, pset: ParameterSet) -> ParameterSetId {
        // may consult the registry for nested tables
        let id = pset.id();

        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.sets.entry(id).or_insert_with(|| {
            tracing::trace!(%id, "registering parameter set");
            Arc::new(pset)
        });
        id
    }

    pub fn put_all(&self, psets: impl IntoIterator<Item = ParameterSet>) -> Vec<ParameterSetId> {
        let _guard = self.inner.lock();
        psets.into_iter().map(|pset| self.put(pset)).collect()
    }

    /// Parameter set registered under `id`, consulting the primary store on a miss
    pub fn get(&self, id: &ParameterSetId) -> Result<Arc<ParameterSet>> {
        let guard = self.inner.lock();

        if let Some(pset) = guard.borrow().sets.get(id) {
            return Ok(pset.clone());
        }

        let blob = match &guard.borrow().primary {
            Some(primary) => primary.blob(&id.to_string())?,
            None => None,
        };

        let Some(blob) = blob else {
            return Err(Error::cant_find_at(
                id.to_string(),
                "-- no such parameter set in the registry",
            ));
        };

        tracing::trace!(%id, "parameter set found in primary store");
        // parsing registers nested tables
        let pset = Arc::new(ParameterSet::make(&blob)?);
        guard
            .borrow_mut()
            .sets
            .entry(*id)
            .or_insert_with(|| pset.clone());
        Ok(pset)
    }

    /// Whether `id` is registered in memory
    pub fn has(&self, id: &ParameterSetId) -> bool {
        self.inner.lock().borrow().sets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().borrow().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge all rows of `source` into the primary store, existing ids are kept
    pub fn import_from(&self, source: &impl BlobStore) -> Result<()> {
        let rows = source.rows()?;
        tracing::debug!(rows = rows.len(), "importing parameter sets");

        if !self.is_global() {
            Self::global().insert_rows(&rows)?;
        }
        self.insert_rows(&rows)
    }

    fn insert_rows(&self, rows: &[(String, String)]) -> Result<()> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let primary = inner.primary()?;
        primary.insert_or_ignore(rows)
    }

    /// Replace the contents of `target` with every known parameter set
    pub fn export_to(&self, target: &impl BlobStore) -> Result<()> {
        let guard = self.inner.lock();

        let (entries, mut rows) = loop {
            let entries: Vec<_> = guard
                .borrow()
                .sets
                .iter()
                .map(|(id, pset)| (*id, pset.clone()))
                .collect();
            let before = entries.len();

            // rendering can register further nested tables, start over if it did
            let rows: Vec<_> = entries
                .iter()
                .map(|(id, pset)| (id.to_string(), pset.to_compact_string()))
                .collect();

            if guard.borrow().sets.len() == before {
                break (entries, rows);
            }
            tracing::debug!("registry changed during export, restarting");
        };

        if !self.is_global() {
            rows.extend(self.nested_rows(entries.iter().map(|(_, pset)| pset.as_ref())));
        }

        if let Some(primary) = &guard.borrow().primary {
            rows.extend(primary.rows()?);
        }

        tracing::debug!(rows = rows.len(), "exporting parameter sets");
        target.recreate()?;
        target.insert_or_ignore(&rows)
    }

    /// Rows of the tables nested in `psets` which are held by the global registry only
    fn nested_rows<'p>(
        &self,
        psets: impl Iterator<Item = &'p ParameterSet>,
    ) -> Vec<(String, String)> {
        let mut pending: Vec<_> = psets.flat_map(ParameterSet::table_ids).collect();
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        while let Some(id) = pending.pop() {
            if !seen.insert(id) || self.has(&id) {
                continue;
            }
            match Self::global().get(&id) {
                Ok(nested) => {
                    pending.extend(nested.table_ids());
                    rows.push((id.to_string(), nested.to_compact_string()));
                }
                Err(_) => {
                    tracing::warn!(%id, "nested parameter set is not registered, not exported")
                }
            }
        }
        rows
    }

    /// Load every row of the primary store into memory
    pub fn stage_in(&self) -> Result<()> {
        let guard = self.inner.lock();

        let rows = match &guard.borrow().primary {
            Some(primary) => primary.rows()?,
            None => return Ok(()),
        };

        for (id, blob) in rows {
            let id: ParameterSetId = id.parse()?;
            if guard.borrow().sets.contains_key(&id) {
                continue;
            }
            let pset = Arc::new(ParameterSet::make(&blob)?);
            guard.borrow_mut().sets.entry(id).or_insert(pset);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn put_is_idempotent() {
        let registry = ParameterSetRegistry::new();
        let first = registry.put(ParameterSet::make("a: 1 b: [1, 2]").unwrap());
        let second = registry.put(ParameterSet::make("b: [1,2]\na: 001").unwrap());

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert!(registry.has(&first));
    }

    #[test]
    fn missing_id() {
        let registry = ParameterSetRegistry::new();
        let id = ParameterSetId::from_canonical("nothing:here");
        assert!(!registry.has(&id));
        let error = registry.get(&id).unwrap_err();
        assert_eq!(error.category(), crate::error::ErrorCategory::CantFind);
    }

    #[test]
    fn export_then_import_round_trip() {
        let source = ParameterSetRegistry::new();
        let id = source.put(ParameterSet::make("x: 1 t: { y: [a, b] }").unwrap());

        let file = store::open_in_memory().unwrap();
        source.export_to(&file).unwrap();
        // the top level set and its nested table
        assert_eq!(file.rows().unwrap().len(), 2);

        let target = ParameterSetRegistry::new();
        target.import_from(&file).unwrap();
        assert!(!target.has(&id));

        let pset = target.get(&id).unwrap();
        assert_eq!(pset.id(), id);
        assert!(target.has(&id));
    }

    #[test]
    fn stage_in_loads_primary_rows() {
        let source = ParameterSetRegistry::new();
        let a = source.put(ParameterSet::make("a: 1").unwrap());
        let b = source.put(ParameterSet::make("b: 2").unwrap());
        let file = store::open_in_memory().unwrap();
        source.export_to(&file).unwrap();

        let target = ParameterSetRegistry::new();
        target.import_from(&file).unwrap();
        target.stage_in().unwrap();
        assert!(target.has(&a));
        assert!(target.has(&b));
        assert_eq!(target.len(), 2);
    }
}
