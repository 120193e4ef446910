//! ApplicationDefinition, the downstream resource produced per chart entry
//!
//! The schema belongs to the application deployment engine. Only the fields the
//! catalog manages are typed here; everything else is kept in `extra` maps and
//! written back untouched.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::catalog::SecretKeySelector;

/// Deployment method used for catalog-generated definitions
pub const HELM_METHOD: &str = "helm";

/// Label set by the deployment engine on definitions it manages itself
pub const SYSTEM_MANAGED_BY_LABEL: &str = "apps.kubermatic.k8c.io/managed-by";

/// Sentinel for an empty values block
pub const EMPTY_VALUES_BLOCK: &str = "{}";

/// ApplicationDefinitionSpec describes an installable application
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "apps.kubermatic.k8c.io",
    version = "v1",
    kind = "ApplicationDefinition",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDefinitionSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub method: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_values_block: String,

    /// Installation is mandatory on matching clusters
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enforced: bool,

    /// Installation is preselected on matching clusters
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<DefinitionSelector>,

    #[serde(rename = "documentationURL", default, skip_serializing_if = "String::is_empty")]
    pub documentation_url: String,

    #[serde(rename = "sourceURL", default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_format: String,

    #[serde(default)]
    pub versions: Vec<ApplicationVersion>,

    /// Fields owned by the deployment engine
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Placement selector
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenters: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One installable version, keyed by `version`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationVersion {
    pub version: String,

    #[serde(default)]
    pub template: ApplicationTemplate,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTemplate {
    #[serde(default)]
    pub source: ApplicationSource,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmSource>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Where the deployment engine pulls the chart from
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmSource {
    pub url: String,

    pub chart_name: String,

    pub chart_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<HelmCredentials>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<SecretKeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretKeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_config_file: Option<SecretKeySelector>,
}

impl ApplicationDefinition {
    /// Owned by the deployment engine itself, never touched by the catalog
    pub fn is_system_managed(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .is_some_and(|labels| labels.contains_key(SYSTEM_MANAGED_BY_LABEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_pass_through() {
        let raw = json!({
            "apiVersion": "apps.kubermatic.k8c.io/v1",
            "kind": "ApplicationDefinition",
            "metadata": { "name": "argo-cd" },
            "spec": {
                "method": "helm",
                "description": "GitOps",
                "defaultNamespace": { "name": "argocd", "create": true },
                "defaultDeployOptions": { "helm": { "wait": true, "timeout": "5m" } },
                "selector": { "datacenters": ["dc1"], "clusterLabels": { "tier": "gold" } },
                "versions": [{
                    "version": "v2.13.1",
                    "template": {
                        "source": {
                            "helm": {
                                "url": "oci://example.com",
                                "chartName": "argo-cd",
                                "chartVersion": "7.7.0",
                                "insecure": true
                            }
                        },
                        "templateCredentials": { "helmCredentials": {} }
                    }
                }]
            }
        });

        let def: ApplicationDefinition = serde_json::from_value(raw.clone()).unwrap();
        assert!(def.spec.extra.contains_key("defaultNamespace"));
        assert_eq!(
            def.spec.selector.as_ref().unwrap().datacenters,
            Some(vec!["dc1".to_string()])
        );

        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["spec"], raw["spec"]);
    }

    #[test]
    fn test_system_managed_detection() {
        let mut def = ApplicationDefinition::new("cilium", ApplicationDefinitionSpec::default());
        assert!(!def.is_system_managed());

        def.metadata.labels = Some(BTreeMap::from([(
            SYSTEM_MANAGED_BY_LABEL.to_string(),
            "kkp".to_string(),
        )]));
        assert!(def.is_system_managed());
    }
}
