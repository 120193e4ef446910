//! Repository precedence resolution
//!
//! A chart version is pulled from the first layer declaring a non-empty base URL:
//!
//! 1. version-level `repositorySettings`
//! 2. chart-level `repositorySettings`
//! 3. catalog-wide `repositorySettings`
//! 4. [`DEFAULT_HELM_REPOSITORY`], without credentials
//!
//! URL and credentials always come from the same layer. A layer with an empty
//! base URL is skipped entirely, credentials included.

use crate::catalog::{
    ApplicationCatalog, ChartConfig, ChartVersion, DEFAULT_HELM_REPOSITORY, RepositoryCredentials,
    RepositorySettings,
};

/// Which layer supplied the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Version,
    Chart,
    Catalog,
    Default,
}

/// Effective repository for one chart version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRepository<'a> {
    pub url: &'a str,
    pub credentials: Option<&'a RepositoryCredentials>,
    pub layer: Layer,
}

/// Resolve the repository URL and credentials for `version` of `chart`
pub fn resolve_repository<'a>(
    global: Option<&'a RepositorySettings>,
    chart: &'a ChartConfig,
    version: &'a ChartVersion,
) -> ResolvedRepository<'a> {
    let layers = [
        (Layer::Version, version.repository_settings.as_ref()),
        (Layer::Chart, chart.repository_settings.as_ref()),
        (Layer::Catalog, global),
    ];

    layers
        .into_iter()
        .find_map(|(layer, settings)| {
            settings
                .filter(|s| !s.base_url.is_empty())
                .map(|s| ResolvedRepository {
                    url: s.base_url.as_str(),
                    credentials: s.credentials.as_ref(),
                    layer,
                })
        })
        .unwrap_or(ResolvedRepository {
            url: DEFAULT_HELM_REPOSITORY,
            credentials: None,
            layer: Layer::Default,
        })
}

impl ApplicationCatalog {
    /// Effective repository URL for a chart version of this catalog
    pub fn resolve_chart_url<'a>(&'a self, chart: &'a ChartConfig, version: &'a ChartVersion) -> &'a str {
        resolve_repository(self.global_repository_settings(), chart, version).url
    }

    /// Effective credentials for a chart version of this catalog
    pub fn resolve_chart_credentials<'a>(
        &'a self,
        chart: &'a ChartConfig,
        version: &'a ChartVersion,
    ) -> Option<&'a RepositoryCredentials> {
        resolve_repository(self.global_repository_settings(), chart, version).credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SecretKeySelector;

    fn settings(url: &str, secret: Option<&str>) -> RepositorySettings {
        RepositorySettings {
            base_url: url.to_string(),
            credentials: secret.map(|name| RepositoryCredentials {
                username: Some(SecretKeySelector::new(name, "username")),
                password: Some(SecretKeySelector::new(name, "password")),
                registry_config_file: None,
            }),
        }
    }

    fn chart(chart_settings: Option<RepositorySettings>, version_settings: Option<RepositorySettings>) -> ChartConfig {
        ChartConfig {
            chart_name: "nginx".to_string(),
            repository_settings: chart_settings,
            chart_versions: vec![ChartVersion {
                repository_settings: version_settings,
                ..ChartVersion::new("1.0.0", "v1.0.0")
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_when_nothing_set() {
        let chart = chart(None, None);
        let resolved = resolve_repository(None, &chart, &chart.chart_versions[0]);

        assert_eq!(resolved.url, DEFAULT_HELM_REPOSITORY);
        assert!(resolved.credentials.is_none());
        assert_eq!(resolved.layer, Layer::Default);
    }

    #[test]
    fn test_version_layer_wins_without_leaking_credentials() {
        let global = settings("oci://global", Some("global-secret"));
        let chart = chart(
            Some(settings("oci://chart", Some("chart-secret"))),
            Some(settings("oci://version", None)),
        );
        let resolved = resolve_repository(Some(&global), &chart, &chart.chart_versions[0]);

        assert_eq!(resolved.url, "oci://version");
        assert_eq!(resolved.layer, Layer::Version);
        assert!(resolved.credentials.is_none());
    }

    #[test]
    fn test_version_layer_credentials() {
        let chart = chart(
            Some(settings("oci://chart", Some("chart-secret"))),
            Some(settings("oci://version", Some("version-secret"))),
        );
        let resolved = resolve_repository(None, &chart, &chart.chart_versions[0]);

        let creds = resolved.credentials.unwrap();
        assert_eq!(creds.username.as_ref().unwrap().name, "version-secret");
    }

    #[test]
    fn test_chart_layer_over_global() {
        let global = settings("oci://global", Some("global-secret"));
        let chart = chart(Some(settings("oci://chart", Some("chart-secret"))), None);
        let resolved = resolve_repository(Some(&global), &chart, &chart.chart_versions[0]);

        assert_eq!(resolved.url, "oci://chart");
        assert_eq!(resolved.credentials.unwrap().password.as_ref().unwrap().name, "chart-secret");
    }

    #[test]
    fn test_empty_base_url_falls_through_with_credentials() {
        let global = settings("oci://global", Some("global-secret"));
        // credentials at a layer without a URL are ignored
        let chart = chart(
            Some(settings("", Some("chart-secret"))),
            Some(settings("", Some("version-secret"))),
        );
        let resolved = resolve_repository(Some(&global), &chart, &chart.chart_versions[0]);

        assert_eq!(resolved.url, "oci://global");
        assert_eq!(resolved.layer, Layer::Catalog);
        assert_eq!(resolved.credentials.unwrap().username.as_ref().unwrap().name, "global-secret");
    }

    #[test]
    fn test_empty_everywhere_uses_default() {
        let global = settings("", Some("global-secret"));
        let chart = chart(Some(settings("", None)), None);
        let resolved = resolve_repository(Some(&global), &chart, &chart.chart_versions[0]);

        assert_eq!(resolved.url, DEFAULT_HELM_REPOSITORY);
        assert!(resolved.credentials.is_none());
    }
}
