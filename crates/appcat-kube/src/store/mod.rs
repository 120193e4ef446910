//! Access to catalogs and ApplicationDefinitions
//!
//! The reconciler and the conflict detector only talk to the cluster through
//! these traits:
//! - **Kube** (default): backed by `kube::Api`
//! - **Mock**: in memory, for tests without a cluster

mod api;
mod mock;

pub use api::{KubeCatalogStore, KubeDefinitionStore};
pub use mock::{MockCatalogStore, MockDefinitionStore, OperationCounts};

use appcat_core::{ApplicationCatalog, ApplicationDefinition};
use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

/// Label selector as exact key/value matches
pub type Selector = BTreeMap<String, String>;

/// ApplicationDefinition persistence
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Get a definition by name, `None` when it does not exist
    async fn get(&self, name: &str) -> Result<Option<ApplicationDefinition>>;

    /// List definitions carrying every label of `selector`
    async fn list(&self, selector: &Selector) -> Result<Vec<ApplicationDefinition>>;

    /// Create a definition. Fails with `AlreadyExists` if the name is taken.
    async fn create(&self, definition: &ApplicationDefinition) -> Result<()>;

    /// Replace a definition. Fails with `Conflict` if its resourceVersion is stale.
    async fn replace(&self, definition: &ApplicationDefinition) -> Result<()>;
}

/// Read access to catalogs
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a catalog by name, `None` when it does not exist
    async fn get(&self, name: &str) -> Result<Option<ApplicationCatalog>>;

    /// Check if a catalog exists
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get(name).await?.is_some())
    }
}

/// Whether `labels` satisfies every entry of `selector`
pub(crate) fn matches_selector(labels: Option<&BTreeMap<String, String>>, selector: &Selector) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.and_then(|l| l.get(key)) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_selector() {
        let labels = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        let selector = Selector::from([("a".to_string(), "1".to_string())]);

        assert!(matches_selector(Some(&labels), &selector));
        assert!(matches_selector(None, &Selector::new()));
        assert!(!matches_selector(None, &selector));
        assert!(!matches_selector(
            Some(&labels),
            &Selector::from([("a".to_string(), "2".to_string())])
        ));
    }
}
