//! Catalog entry to ApplicationDefinition conversion

use kube::ResourceExt;

use crate::catalog::{ApplicationCatalog, ChartConfig, RepositoryCredentials};
use crate::definition::{
    ApplicationDefinition, ApplicationDefinitionSpec, ApplicationSource, ApplicationTemplate,
    ApplicationVersion, HELM_METHOD, HelmCredentials, HelmSource,
};
use crate::ownership;
use crate::resolver::resolve_repository;

/// Build the ApplicationDefinition a chart entry of `catalog` declares.
///
/// Pure: no defaults are invented for missing metadata. Versions are sorted by
/// key so a freshly created definition is already in merged form.
pub fn convert_chart(catalog: &ApplicationCatalog, chart: &ChartConfig) -> ApplicationDefinition {
    let global = catalog.global_repository_settings();

    let mut versions: Vec<ApplicationVersion> = chart
        .chart_versions
        .iter()
        .map(|version| {
            let repository = resolve_repository(global, chart, version);
            ApplicationVersion {
                version: version.app_version.clone(),
                template: ApplicationTemplate {
                    source: ApplicationSource {
                        helm: Some(HelmSource {
                            url: repository.url.to_string(),
                            chart_name: chart.chart_name.clone(),
                            chart_version: version.chart_version.clone(),
                            credentials: repository.credentials.map(helm_credentials),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            }
        })
        .collect();
    versions.sort_by(|a, b| a.version.cmp(&b.version));

    let mut spec = ApplicationDefinitionSpec {
        method: HELM_METHOD.to_string(),
        default_values_block: chart.default_values_block.clone().unwrap_or_default(),
        versions,
        ..Default::default()
    };

    if let Some(meta) = &chart.metadata {
        spec.display_name = meta.display_name.clone();
        spec.description = meta.description.clone();
        spec.documentation_url = meta.documentation_url.clone();
        spec.source_url = meta.source_url.clone();
        spec.logo = meta.logo.clone();
        spec.logo_format = meta.logo_format.clone();
    }

    let mut definition = ApplicationDefinition::new(chart.app_name(), spec);
    ownership::set_owner(&mut definition.metadata, &catalog.name_any());
    definition
}

/// Convert every entry of `catalog`. Absent entries convert to nothing.
pub fn convert_catalog(catalog: &ApplicationCatalog) -> Vec<ApplicationDefinition> {
    catalog
        .helm_charts()
        .unwrap_or_default()
        .iter()
        .map(|chart| convert_chart(catalog, chart))
        .collect()
}

fn helm_credentials(credentials: &RepositoryCredentials) -> HelmCredentials {
    HelmCredentials {
        username: credentials.username.clone(),
        password: credentials.password.clone(),
        registry_config_file: credentials.registry_config_file.clone(),
    }
}
