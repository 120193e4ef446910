//! Catalog ownership of downstream resources
//!
//! Ownership is a weak relation stored as two labels on the owned object:
//! - `applicationcatalog.k8c.io/managed-by: "true"`
//! - `applicationcatalog.k8c.io/catalog-name: <catalog>`
//!
//! An object without a non-empty owner label is unmanaged and can be adopted by
//! any catalog declaring its name.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Marks a resource as generated from a catalog
pub const MANAGED_BY_LABEL: &str = "applicationcatalog.k8c.io/managed-by";

/// Name of the owning catalog
pub const CATALOG_NAME_LABEL: &str = "applicationcatalog.k8c.io/catalog-name";

/// Value of [`MANAGED_BY_LABEL`] on managed resources
pub const MANAGED_BY_VALUE: &str = "true";

/// Owner of a downstream resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Unmanaged,
    Managed { catalog: String },
}

impl Ownership {
    /// True when owned by a catalog other than `catalog`
    pub fn conflicts_with(&self, catalog: &str) -> bool {
        matches!(self, Ownership::Managed { catalog: owner } if owner != catalog)
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Ownership::Unmanaged => None,
            Ownership::Managed { catalog } => Some(catalog),
        }
    }
}

/// Read the ownership relation from object metadata
pub fn ownership(meta: &ObjectMeta) -> Ownership {
    meta.labels
        .as_ref()
        .and_then(|labels| labels.get(CATALOG_NAME_LABEL))
        .filter(|owner| !owner.is_empty())
        .map(|owner| Ownership::Managed {
            catalog: owner.clone(),
        })
        .unwrap_or(Ownership::Unmanaged)
}

/// Labels carried by every resource owned by `catalog`
pub fn owner_labels(catalog: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
        (CATALOG_NAME_LABEL.to_string(), catalog.to_string()),
    ])
}

/// Label selector matching every catalog-managed resource
pub fn managed_selector() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())])
}

/// Label selector matching the resources owned by `catalog`
pub fn owned_by_selector(catalog: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(CATALOG_NAME_LABEL.to_string(), catalog.to_string())])
}

/// Render a selector map as a Kubernetes label selector string
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Record `catalog` as owner, keeping every other label
pub fn set_owner(meta: &mut ObjectMeta, catalog: &str) {
    meta.labels
        .get_or_insert_with(BTreeMap::new)
        .extend(owner_labels(catalog));
}

/// Remove both ownership labels. Returns whether anything changed.
pub fn clear_owner(meta: &mut ObjectMeta) -> bool {
    let Some(labels) = meta.labels.as_mut() else {
        return false;
    };
    let removed_managed = labels.remove(MANAGED_BY_LABEL).is_some();
    let removed_owner = labels.remove(CATALOG_NAME_LABEL).is_some();
    removed_managed || removed_owner
}
