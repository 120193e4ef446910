//! Typed merge of a desired ApplicationDefinition into the existing object
//!
//! Field precedence:
//!
//! | field                  | winner                                                 |
//! |------------------------|--------------------------------------------------------|
//! | ownership labels       | desired (other labels kept)                            |
//! | `enforced`, `default`  | existing when `true`                                   |
//! | `selector`             | existing when set, `datacenters` filled from desired   |
//! | `defaultValuesBlock`   | existing unless exactly empty or `{}`                  |
//! | `versions`             | union by version key, desired updates, sorted by key   |
//! | untyped spec fields    | existing                                               |
//! | everything else        | desired                                                |

use crate::definition::{ApplicationDefinition, ApplicationVersion, EMPTY_VALUES_BLOCK};

/// Merge `desired` into `existing`, returning the object to write back.
///
/// Metadata other than labels (resourceVersion included) comes from `existing`.
pub fn merge_definition(existing: &ApplicationDefinition, desired: &ApplicationDefinition) -> ApplicationDefinition {
    let mut merged = existing.clone();

    if let Some(labels) = &desired.metadata.labels {
        merged
            .metadata
            .labels
            .get_or_insert_with(Default::default)
            .extend(labels.clone());
    }

    let current = &existing.spec;
    let mut spec = desired.spec.clone();

    spec.enforced = current.enforced || desired.spec.enforced;
    spec.default = current.default || desired.spec.default;

    if let Some(existing_selector) = &current.selector {
        let mut selector = existing_selector.clone();
        if selector.datacenters.is_none() {
            selector.datacenters = desired.spec.selector.as_ref().and_then(|s| s.datacenters.clone());
        }
        spec.selector = Some(selector);
    }

    if has_values(&current.default_values_block) {
        spec.default_values_block = current.default_values_block.clone();
    }

    spec.versions = merge_versions(&current.versions, &desired.spec.versions);

    let mut extra = current.extra.clone();
    extra.extend(desired.spec.extra.clone());
    spec.extra = extra;

    merged.spec = spec;
    merged
}

/// Union of `existing` and `desired` versions keyed by `version`.
///
/// Keys present in both take the desired chart source while keeping fields the
/// catalog does not manage. Keys only in `existing` are kept. Result is sorted.
pub fn merge_versions(existing: &[ApplicationVersion], desired: &[ApplicationVersion]) -> Vec<ApplicationVersion> {
    let mut merged = existing.to_vec();

    for version in desired {
        match merged.iter_mut().find(|v| v.version == version.version) {
            Some(current) => update_version(current, version),
            None => merged.push(version.clone()),
        }
    }

    merged.sort_by(|a, b| a.version.cmp(&b.version));
    merged
}

/// Whether applying `merged` would change `existing`
pub fn needs_update(existing: &ApplicationDefinition, merged: &ApplicationDefinition) -> bool {
    existing.metadata.labels != merged.metadata.labels || existing.spec != merged.spec
}

fn has_values(block: &str) -> bool {
    !block.is_empty() && block != EMPTY_VALUES_BLOCK
}

fn update_version(current: &mut ApplicationVersion, desired: &ApplicationVersion) {
    let Some(desired_helm) = &desired.template.source.helm else {
        return;
    };
    match current.template.source.helm.as_mut() {
        Some(helm) => {
            helm.url = desired_helm.url.clone();
            helm.chart_name = desired_helm.chart_name.clone();
            helm.chart_version = desired_helm.chart_version.clone();
            helm.credentials = desired_helm.credentials.clone();
        }
        None => current.template.source.helm = Some(desired_helm.clone()),
    }
}
