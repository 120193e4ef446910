//! Catalog reconciliation
//!
//! For one catalog name:
//! - **not found**: release every definition it owns (labels removed, objects kept)
//! - **charts absent with includeDefaults**: defaults not injected yet, retry shortly
//! - **otherwise**: upsert one definition per entry, then release the owned
//!   definitions no entry produced
//!
//! Entry failures are collected so one bad entry does not block the others.
//! Writes are read-merge-write with a bounded number of conflict retries.

use appcat_core::ownership::{self, managed_selector, owned_by_selector};
use appcat_core::{ApplicationDefinition, convert_catalog, merge_definition, needs_update};
use kube::ResourceExt;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::store::{CatalogStore, DefinitionStore};

/// Delay before retrying a catalog still waiting for its defaults
pub const DEFAULTS_PENDING_REQUEUE: Duration = Duration::from_secs(10);

/// Default bound on a single reconcile pass
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Read-merge-write attempts per definition
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Result of one reconcile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Catalog exists and its definitions are converged
    Synced(SyncSummary),
    /// Catalog is gone, its definitions were released
    Orphaned { count: usize },
    /// includeDefaults is set but charts are still absent
    AwaitingDefaults,
}

/// What a successful pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Definitions managed by the deployment engine itself
    pub skipped: usize,
    pub orphaned: usize,
}

impl SyncSummary {
    /// Number of writes performed
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.orphaned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

/// Converges ApplicationDefinitions with their catalogs
pub struct Reconciler {
    catalogs: Arc<dyn CatalogStore>,
    definitions: Arc<dyn DefinitionStore>,
    timeout: Duration,
    /// One in-flight pass per catalog name
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(catalogs: Arc<dyn CatalogStore>, definitions: Arc<dyn DefinitionStore>) -> Self {
        Self {
            catalogs,
            definitions,
            timeout: DEFAULT_RECONCILE_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bound every pass by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reconcile the catalog called `name`
    pub async fn reconcile(&self, name: &str) -> Result<ReconcileOutcome> {
        let lock = self.lock_for(name);
        let result = {
            let _guard = lock.lock().await;
            match tokio::time::timeout(self.timeout, self.reconcile_catalog(name)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(catalog = %name, timeout = ?self.timeout, "reconciliation timed out");
                    Err(SyncError::Timeout(self.timeout))
                }
            }
        };
        self.forget_lock(name, lock);
        result
    }

    /// Release definitions whose owning catalog no longer exists.
    ///
    /// Covers catalogs deleted while no controller was watching. Returns the
    /// number of definitions released.
    pub async fn sweep_orphaned_owners(&self) -> Result<usize> {
        let managed = self.definitions.list(&managed_selector()).await?;
        let owners: BTreeSet<String> = managed
            .iter()
            .filter_map(|def| ownership::ownership(&def.metadata).owner().map(str::to_string))
            .collect();

        let mut released = 0;
        let mut errors = Vec::new();
        for owner in owners {
            if self.catalogs.exists(&owner).await? {
                continue;
            }
            match self.reconcile(&owner).await {
                Ok(ReconcileOutcome::Orphaned { count }) => released += count,
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }

        SyncError::aggregate(errors)?;
        Ok(released)
    }

    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Drop the lock of `name` once no other pass holds or awaits it
    fn forget_lock(&self, name: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are taken and released under this mutex: map + ours means idle.
        if locks.get(name).is_some_and(|held| Arc::ptr_eq(held, &lock)) && Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
        drop(lock);
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn reconcile_catalog(&self, name: &str) -> Result<ReconcileOutcome> {
        let Some(catalog) = self.catalogs.get(name).await? else {
            let count = self.release_orphans(name, &BTreeSet::new()).await?;
            info!(catalog = %name, released = count, "catalog deleted, released its definitions");
            return Ok(ReconcileOutcome::Orphaned { count });
        };

        if catalog.helm_charts().is_none() && catalog.include_defaults() {
            debug!(catalog = %name, "charts not defaulted yet, requeueing");
            return Ok(ReconcileOutcome::AwaitingDefaults);
        }

        let mut summary = SyncSummary::default();
        let mut produced = BTreeSet::new();
        let mut errors = Vec::new();

        for desired in convert_catalog(&catalog) {
            let definition = desired.name_any();
            produced.insert(definition.clone());

            match self.upsert(&desired).await {
                Ok(Upsert::Created) => summary.created += 1,
                Ok(Upsert::Updated) => summary.updated += 1,
                Ok(Upsert::Unchanged) => summary.unchanged += 1,
                Ok(Upsert::Skipped) => {
                    debug!(catalog = %name, definition = %definition, "definition is system managed, skipping");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(catalog = %name, definition = %definition, error = %e, "failed to apply definition");
                    errors.push(e);
                }
            }
        }

        match self.release_orphans(name, &produced).await {
            Ok(count) => summary.orphaned = count,
            Err(e) => errors.push(e),
        }

        SyncError::aggregate(errors)?;

        if summary.writes() > 0 {
            info!(
                catalog = %name,
                created = summary.created,
                updated = summary.updated,
                released = summary.orphaned,
                "catalog reconciled"
            );
        }
        Ok(ReconcileOutcome::Synced(summary))
    }

    async fn upsert(&self, desired: &ApplicationDefinition) -> Result<Upsert> {
        let name = desired.name_any();
        let mut attempt = 1;
        loop {
            match self.try_upsert(desired, &name).await {
                Err(e) if (e.is_conflict() || e.is_not_found()) && attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(definition = %name, attempt, error = %e, "write raced, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_upsert(&self, desired: &ApplicationDefinition, name: &str) -> Result<Upsert> {
        let Some(existing) = self.definitions.get(name).await? else {
            self.definitions.create(desired).await?;
            return Ok(Upsert::Created);
        };

        if existing.is_system_managed() {
            return Ok(Upsert::Skipped);
        }

        let merged = merge_definition(&existing, desired);
        if !needs_update(&existing, &merged) {
            return Ok(Upsert::Unchanged);
        }

        self.definitions.replace(&merged).await?;
        Ok(Upsert::Updated)
    }

    /// Strip ownership from every definition of `catalog` not listed in `keep`
    async fn release_orphans(&self, catalog: &str, keep: &BTreeSet<String>) -> Result<usize> {
        let owned = self.definitions.list(&owned_by_selector(catalog)).await?;

        let mut released = 0;
        let mut errors = Vec::new();
        for definition in owned {
            if keep.contains(&definition.name_any()) {
                continue;
            }
            match self.release(definition, catalog).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => errors.push(e),
            }
        }

        SyncError::aggregate(errors)?;
        Ok(released)
    }

    /// Remove the ownership labels of `definition` if `catalog` still owns it
    async fn release(&self, mut definition: ApplicationDefinition, catalog: &str) -> Result<bool> {
        let name = definition.name_any();
        let mut attempt = 1;
        loop {
            if ownership::ownership(&definition.metadata).owner() != Some(catalog) {
                return Ok(false);
            }

            let mut released = definition.clone();
            ownership::clear_owner(&mut released.metadata);

            match self.definitions.replace(&released).await {
                Ok(()) => {
                    debug!(catalog = %catalog, definition = %name, "released definition");
                    return Ok(true);
                }
                Err(e) if e.is_not_found() => return Ok(false),
                Err(e) if e.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    attempt += 1;
                    match self.definitions.get(&name).await? {
                        Some(fresh) => definition = fresh,
                        None => return Ok(false),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
