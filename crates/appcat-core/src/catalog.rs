//! ApplicationCatalog custom resource
//!
//! A catalog is a cluster-scoped list of Helm chart entries. Each entry is turned
//! into one downstream [`ApplicationDefinition`](crate::definition::ApplicationDefinition)
//! by the converter.
//!
//! The `charts` list has three distinct states that must survive a round trip:
//! - **absent** (`None`): the caller wants the built-in defaults injected once
//! - **empty** (`Some(vec![])`): the caller explicitly wants zero entries
//! - **populated**: the caller's own entries

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the catalog resource
pub const GROUP: &str = "applicationcatalog.k8c.io";

/// API version of the catalog resource
pub const VERSION: &str = "v1alpha1";

/// Repository used when no layer of the catalog declares a base URL
pub const DEFAULT_HELM_REPOSITORY: &str = "oci://quay.io/kubermatic-mirror/helm-charts";

/// Annotation restricting which built-in defaults are included
pub const INCLUDE_ANNOTATION: &str = "defaultcatalog.k8c.io/include";

/// ApplicationCatalogSpec declares the charts a catalog publishes
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "applicationcatalog.k8c.io",
    version = "v1alpha1",
    kind = "ApplicationCatalog",
    shortname = "appcat",
    status = "ApplicationCatalogStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCatalogSpec {
    /// Helm chart configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmSpec>,
}

/// Status of an ApplicationCatalog
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCatalogStatus {
    /// Generation last processed by the controller
    #[serde(default)]
    pub observed_generation: i64,
}

/// Helm block of a catalog
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmSpec {
    /// Repository settings applied to every chart unless overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_settings: Option<RepositorySettings>,

    /// Chart entries. `None` and an empty list mean different things.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartConfig>>,

    /// Keep the built-in default charts merged into `charts` on every update
    #[serde(default)]
    pub include_defaults: bool,
}

/// Repository location plus optional credentials
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySettings {
    /// Repository URL, e.g. `oci://registry.example.com/charts`
    #[serde(rename = "baseURL", default)]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<RepositoryCredentials>,
}

/// Secret references used to authenticate against a repository
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<SecretKeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretKeySelector>,

    /// Docker-style registry config (`.dockerconfigjson`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_config_file: Option<SecretKeySelector>,
}

/// Reference to a key inside a Secret. Never an inline value.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,

    /// Key within the Secret
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

impl SecretKeySelector {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            optional: None,
        }
    }
}

/// One chart entry of a catalog
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Chart name within the repository
    pub chart_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChartMetadata>,

    /// Overrides the catalog-wide repository settings for this chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_settings: Option<RepositorySettings>,

    /// Default values passed to the chart, as YAML text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_values_block: Option<String>,

    /// Published versions of the chart
    #[serde(default)]
    pub chart_versions: Vec<ChartVersion>,
}

impl ChartConfig {
    /// Name of the downstream resource this entry produces.
    ///
    /// `metadata.appName` when set and non-empty, the chart name otherwise.
    pub fn app_name(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.app_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.chart_name)
    }
}

/// Display metadata of a chart entry
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Overrides the chart name as the downstream resource name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "documentationURL", default, skip_serializing_if = "String::is_empty")]
    pub documentation_url: String,

    #[serde(rename = "sourceURL", default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,

    /// Base64 encoded logo
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,

    /// `svg+xml` or `png`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_format: String,
}

/// One published version of a chart
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    /// Helm chart version
    pub chart_version: String,

    /// Application version, used as the version key downstream
    pub app_version: String,

    /// Overrides chart and catalog repository settings for this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_settings: Option<RepositorySettings>,
}

impl ChartVersion {
    pub fn new(chart_version: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            chart_version: chart_version.into(),
            app_version: app_version.into(),
            repository_settings: None,
        }
    }
}

/// State of the `charts` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartsState {
    /// No helm block, or `charts` not set
    Absent,
    /// `charts: []`
    Empty,
    Populated,
}

impl ApplicationCatalog {
    /// Chart entries, `None` when the helm block or the list is absent
    pub fn helm_charts(&self) -> Option<&[ChartConfig]> {
        self.spec.helm.as_ref()?.charts.as_deref()
    }

    /// Catalog-wide repository settings
    pub fn global_repository_settings(&self) -> Option<&RepositorySettings> {
        self.spec.helm.as_ref()?.repository_settings.as_ref()
    }

    pub fn include_defaults(&self) -> bool {
        self.spec.helm.as_ref().is_some_and(|h| h.include_defaults)
    }

    pub fn charts_state(&self) -> ChartsState {
        match self.helm_charts() {
            None => ChartsState::Absent,
            Some([]) => ChartsState::Empty,
            Some(_) => ChartsState::Populated,
        }
    }

    /// Value of the include filter annotation, if set
    pub fn include_annotation(&self) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()?
            .get(INCLUDE_ANNOTATION)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_from_yaml(yaml: &str) -> ApplicationCatalog {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_app_name_prefers_metadata() {
        let mut chart = ChartConfig {
            chart_name: "gpu-operator".to_string(),
            ..Default::default()
        };
        assert_eq!(chart.app_name(), "gpu-operator");

        chart.metadata = Some(ChartMetadata {
            app_name: "nvidia-gpu-operator".to_string(),
            ..Default::default()
        });
        assert_eq!(chart.app_name(), "nvidia-gpu-operator");
    }

    #[test]
    fn test_app_name_ignores_empty_override() {
        let chart = ChartConfig {
            chart_name: "nginx".to_string(),
            metadata: Some(ChartMetadata::default()),
            ..Default::default()
        };
        assert_eq!(chart.app_name(), "nginx");
    }

    #[test]
    fn test_charts_state_distinguishes_absent_and_empty() {
        let absent = catalog_from_yaml(
            r#"
apiVersion: applicationcatalog.k8c.io/v1alpha1
kind: ApplicationCatalog
metadata:
  name: c1
spec:
  helm: {}
"#,
        );
        assert_eq!(absent.charts_state(), ChartsState::Absent);
        assert!(absent.helm_charts().is_none());

        let empty = catalog_from_yaml(
            r#"
apiVersion: applicationcatalog.k8c.io/v1alpha1
kind: ApplicationCatalog
metadata:
  name: c1
spec:
  helm:
    charts: []
"#,
        );
        assert_eq!(empty.charts_state(), ChartsState::Empty);

        let no_helm = catalog_from_yaml(
            r#"
apiVersion: applicationcatalog.k8c.io/v1alpha1
kind: ApplicationCatalog
metadata:
  name: c1
spec: {}
"#,
        );
        assert_eq!(no_helm.charts_state(), ChartsState::Absent);
        assert!(!no_helm.include_defaults());
    }

    #[test]
    fn test_empty_charts_survive_serialization() {
        let catalog = ApplicationCatalog::new(
            "c1",
            ApplicationCatalogSpec {
                helm: Some(HelmSpec {
                    charts: Some(vec![]),
                    ..Default::default()
                }),
            },
        );
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["spec"]["helm"]["charts"], serde_json::json!([]));

        let back: ApplicationCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(back.charts_state(), ChartsState::Empty);
    }

    #[test]
    fn test_wire_field_names() {
        let catalog = catalog_from_yaml(
            r#"
apiVersion: applicationcatalog.k8c.io/v1alpha1
kind: ApplicationCatalog
metadata:
  name: c1
  annotations:
    defaultcatalog.k8c.io/include: "argo-cd"
spec:
  helm:
    includeDefaults: true
    repositorySettings:
      baseURL: oci://example.com/charts
      credentials:
        username:
          name: repo-auth
          key: user
    charts:
      - chartName: nginx
        metadata:
          documentationURL: https://docs.example.com
          sourceURL: https://src.example.com
        chartVersions:
          - chartVersion: 1.0.0
            appVersion: v1.0.0
"#,
        );
        assert!(catalog.include_defaults());
        assert_eq!(catalog.include_annotation(), Some("argo-cd"));

        let global = catalog.global_repository_settings().unwrap();
        assert_eq!(global.base_url, "oci://example.com/charts");
        assert_eq!(
            global.credentials.as_ref().unwrap().username,
            Some(SecretKeySelector::new("repo-auth", "user"))
        );

        let chart = &catalog.helm_charts().unwrap()[0];
        let meta = chart.metadata.as_ref().unwrap();
        assert_eq!(meta.documentation_url, "https://docs.example.com");
        assert_eq!(meta.source_url, "https://src.example.com");
        assert_eq!(chart.chart_versions[0].app_version, "v1.0.0");
    }
}
