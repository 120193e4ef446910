//! In-memory stores for testing
//!
//! The definition store simulates apiserver optimistic concurrency: every write
//! bumps `resourceVersion` and a replace carrying a stale version is rejected.

use appcat_core::{ApplicationCatalog, ApplicationDefinition};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{CatalogStore, DefinitionStore, Selector, matches_selector};
use crate::error::{Result, SyncError};

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub creates: usize,
    pub replaces: usize,
}

impl OperationCounts {
    /// Number of writes (creates + replaces)
    pub fn writes(&self) -> usize {
        self.creates + self.replaces
    }
}

#[derive(Default)]
struct Faults {
    /// Replaces to reject with a conflict before succeeding
    conflicts: usize,
    /// Names whose writes always fail
    broken: HashSet<String>,
    /// Fail every list call
    list_error: bool,
}

/// In-memory ApplicationDefinition store
#[derive(Clone, Default)]
pub struct MockDefinitionStore {
    objects: Arc<RwLock<BTreeMap<String, ApplicationDefinition>>>,
    revision: Arc<RwLock<u64>>,
    faults: Arc<RwLock<Faults>>,
    operations: Arc<RwLock<OperationCounts>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MockDefinitionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated definitions
    pub fn with_definitions(definitions: Vec<ApplicationDefinition>) -> Self {
        let store = Self::new();
        for definition in definitions {
            store.insert(definition);
        }
        store
    }

    /// Insert or overwrite a definition, bypassing concurrency checks
    pub fn insert(&self, mut definition: ApplicationDefinition) {
        definition.metadata.resource_version = Some(self.next_revision());
        write(&self.objects).insert(definition.name_any(), definition);
    }

    /// Snapshot of a stored definition
    pub fn definition(&self, name: &str) -> Option<ApplicationDefinition> {
        read(&self.objects).get(name).cloned()
    }

    /// Snapshot of every stored definition, sorted by name
    pub fn all_definitions(&self) -> Vec<ApplicationDefinition> {
        read(&self.objects).values().cloned().collect()
    }

    /// Count stored definitions
    pub fn definition_count(&self) -> usize {
        read(&self.objects).len()
    }

    /// Reject the next `count` replaces with a conflict
    pub fn inject_conflicts(&self, count: usize) {
        write(&self.faults).conflicts = count;
    }

    /// Make every write of `name` fail
    pub fn break_writes(&self, name: &str) {
        write(&self.faults).broken.insert(name.to_string());
    }

    /// Undo [`Self::break_writes`] for `name`
    pub fn repair_writes(&self, name: &str) {
        write(&self.faults).broken.remove(name);
    }

    /// Make list calls fail
    pub fn break_lists(&self) {
        write(&self.faults).list_error = true;
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        read(&self.operations).clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *write(&self.operations) = OperationCounts::default();
    }

    fn next_revision(&self) -> String {
        let mut revision = write(&self.revision);
        *revision += 1;
        revision.to_string()
    }

    fn check_broken(&self, name: &str) -> Result<()> {
        if read(&self.faults).broken.contains(name) {
            return Err(SyncError::InvalidConfig(format!("injected write failure for '{}'", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl DefinitionStore for MockDefinitionStore {
    async fn get(&self, name: &str) -> Result<Option<ApplicationDefinition>> {
        write(&self.operations).gets += 1;
        Ok(self.definition(name))
    }

    async fn list(&self, selector: &Selector) -> Result<Vec<ApplicationDefinition>> {
        write(&self.operations).lists += 1;

        if read(&self.faults).list_error {
            return Err(SyncError::InvalidConfig("injected list failure".to_string()));
        }

        Ok(read(&self.objects)
            .values()
            .filter(|def| matches_selector(def.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn create(&self, definition: &ApplicationDefinition) -> Result<()> {
        write(&self.operations).creates += 1;

        let name = definition.name_any();
        self.check_broken(&name)?;

        if read(&self.objects).contains_key(&name) {
            return Err(SyncError::AlreadyExists { name });
        }

        self.insert(definition.clone());
        Ok(())
    }

    async fn replace(&self, definition: &ApplicationDefinition) -> Result<()> {
        write(&self.operations).replaces += 1;

        let name = definition.name_any();
        self.check_broken(&name)?;

        {
            let mut faults = write(&self.faults);
            if faults.conflicts > 0 {
                faults.conflicts -= 1;
                return Err(SyncError::Conflict { name });
            }
        }

        let current = read(&self.objects)
            .get(&name)
            .map(|def| def.metadata.resource_version.clone());

        match current {
            None => Err(SyncError::NotFound { name }),
            Some(version) if definition.metadata.resource_version.is_some() && definition.metadata.resource_version != version => {
                Err(SyncError::Conflict { name })
            }
            Some(_) => {
                self.insert(definition.clone());
                Ok(())
            }
        }
    }
}

/// In-memory catalog store
#[derive(Clone, Default)]
pub struct MockCatalogStore {
    catalogs: Arc<RwLock<BTreeMap<String, ApplicationCatalog>>>,
}

impl MockCatalogStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated catalogs
    pub fn with_catalogs(catalogs: Vec<ApplicationCatalog>) -> Self {
        let store = Self::new();
        for catalog in catalogs {
            store.apply(catalog);
        }
        store
    }

    /// Create or overwrite a catalog
    pub fn apply(&self, catalog: ApplicationCatalog) {
        write(&self.catalogs).insert(catalog.name_any(), catalog);
    }

    /// Delete a catalog, returning it if it existed
    pub fn delete(&self, name: &str) -> Option<ApplicationCatalog> {
        write(&self.catalogs).remove(name)
    }
}

#[async_trait]
impl CatalogStore for MockCatalogStore {
    async fn get(&self, name: &str) -> Result<Option<ApplicationCatalog>> {
        Ok(read(&self.catalogs).get(name).cloned())
    }
}
