//! Stores backed by the Kubernetes API
//!
//! Both resources are cluster scoped. Writes use plain create/replace so that
//! the apiserver enforces resourceVersion preconditions.

use appcat_core::ownership::selector_string;
use appcat_core::{ApplicationCatalog, ApplicationDefinition};
use async_trait::async_trait;
use kube::Client;
use kube::ResourceExt;
use kube::api::{Api, ListParams, PostParams};

use super::{CatalogStore, DefinitionStore, Selector};
use crate::error::{Result, SyncError};

/// ApplicationDefinitions in the cluster
#[derive(Clone)]
pub struct KubeDefinitionStore {
    api: Api<ApplicationDefinition>,
}

impl KubeDefinitionStore {
    /// Create with an existing client
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl DefinitionStore for KubeDefinitionStore {
    async fn get(&self, name: &str) -> Result<Option<ApplicationDefinition>> {
        Ok(self.api.get_opt(name).await?)
    }

    async fn list(&self, selector: &Selector) -> Result<Vec<ApplicationDefinition>> {
        let params = ListParams::default().labels(&selector_string(selector));
        Ok(self.api.list(&params).await?.items)
    }

    async fn create(&self, definition: &ApplicationDefinition) -> Result<()> {
        match self.api.create(&PostParams::default(), definition).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 409 => Err(SyncError::AlreadyExists {
                name: definition.name_any(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, definition: &ApplicationDefinition) -> Result<()> {
        let name = definition.name_any();
        match self.api.replace(&name, &PostParams::default(), definition).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 409 => Err(SyncError::Conflict { name }),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(SyncError::NotFound { name }),
            Err(e) => Err(e.into()),
        }
    }
}

/// ApplicationCatalogs in the cluster
#[derive(Clone)]
pub struct KubeCatalogStore {
    api: Api<ApplicationCatalog>,
}

impl KubeCatalogStore {
    /// Create with an existing client
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl CatalogStore for KubeCatalogStore {
    async fn get(&self, name: &str) -> Result<Option<ApplicationCatalog>> {
        Ok(self.api.get_opt(name).await?)
    }
}
