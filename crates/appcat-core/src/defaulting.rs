//! Default chart injection
//!
//! Runs at admission on every create and update:
//!
//! | includeDefaults | charts            | effect                                      |
//! |-----------------|-------------------|---------------------------------------------|
//! | false           | absent            | inject the full default set once            |
//! | false           | empty / populated | untouched                                   |
//! | true            | absent / empty    | filtered defaults                           |
//! | true            | populated         | filtered defaults, user entries win by name |
//!
//! The include annotation is lenient here: unknown names are dropped. The strict
//! check lives in [`validate_include_annotation`] and only runs at validation.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{ApplicationCatalog, ChartConfig, ChartsState, HelmSpec};
use crate::defaults::{default_charts, find_default_chart};

/// What the defaulting pass did to a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultingOutcome {
    /// Left as is
    Unchanged,
    /// Absent list filled with the full default set
    Injected { count: usize },
    /// List rebuilt from the (filtered) defaults and the user's entries
    Synced { defaults: usize, total: usize },
}

/// Parse the include annotation into a set of identities.
///
/// `None` means no filter: the annotation is absent or holds no names.
pub fn parse_include_annotation(value: Option<&str>) -> Option<BTreeSet<String>> {
    let names: BTreeSet<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    (!names.is_empty()).then_some(names)
}

/// Built-in defaults selected by the include annotation, sorted by identity
pub fn filtered_default_charts(annotation: Option<&str>) -> Vec<ChartConfig> {
    let filter = parse_include_annotation(annotation);
    default_charts()
        .iter()
        .filter(|chart| {
            filter
                .as_ref()
                .is_none_or(|names| names.contains(chart.app_name()))
        })
        .cloned()
        .collect()
}

/// Names in the include annotation that are not built-in defaults, in order
pub fn validate_include_annotation(value: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| find_default_chart(s).is_none())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

/// Apply the defaulting rules to `catalog` in place.
///
/// Only `spec.helm.charts` is written (and `spec.helm` when it is missing).
pub fn default_application_catalog(catalog: &mut ApplicationCatalog) -> DefaultingOutcome {
    let include = catalog.include_defaults();
    let state = catalog.charts_state();
    let annotation = catalog.include_annotation().map(str::to_string);

    match (include, state) {
        (false, ChartsState::Absent) => {
            let charts = default_charts().to_vec();
            let count = charts.len();
            helm_mut(catalog).charts = Some(charts);
            DefaultingOutcome::Injected { count }
        }
        (false, _) => DefaultingOutcome::Unchanged,
        (true, ChartsState::Absent | ChartsState::Empty) => {
            let charts = filtered_default_charts(annotation.as_deref());
            let count = charts.len();
            helm_mut(catalog).charts = Some(charts);
            DefaultingOutcome::Synced {
                defaults: count,
                total: count,
            }
        }
        (true, ChartsState::Populated) => {
            let defaults = filtered_default_charts(annotation.as_deref());
            let default_count = defaults.len();

            let mut merged: BTreeMap<String, ChartConfig> = defaults
                .into_iter()
                .map(|chart| (chart.app_name().to_string(), chart))
                .collect();

            let user_charts = catalog.helm_charts().unwrap_or_default();
            for chart in user_charts {
                merged.insert(chart.app_name().to_string(), chart.clone());
            }

            let charts: Vec<ChartConfig> = merged.into_values().collect();
            let total = charts.len();
            helm_mut(catalog).charts = Some(charts);
            DefaultingOutcome::Synced {
                defaults: default_count,
                total,
            }
        }
    }
}

fn helm_mut(catalog: &mut ApplicationCatalog) -> &mut HelmSpec {
    catalog.spec.helm.get_or_insert_with(HelmSpec::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ApplicationCatalogSpec, ChartMetadata, ChartVersion, INCLUDE_ANNOTATION};
    use std::collections::BTreeMap as Map;

    fn chart(name: &str, version: &str) -> ChartConfig {
        ChartConfig {
            chart_name: name.to_string(),
            chart_versions: vec![ChartVersion::new(version, version)],
            ..Default::default()
        }
    }

    fn catalog(include_defaults: bool, charts: Option<Vec<ChartConfig>>, annotation: Option<&str>) -> ApplicationCatalog {
        let mut catalog = ApplicationCatalog::new(
            "test-catalog",
            ApplicationCatalogSpec {
                helm: Some(HelmSpec {
                    charts,
                    include_defaults,
                    ..Default::default()
                }),
            },
        );
        if let Some(value) = annotation {
            catalog.metadata.annotations =
                Some(Map::from([(INCLUDE_ANNOTATION.to_string(), value.to_string())]));
        }
        catalog
    }

    fn names(catalog: &ApplicationCatalog) -> Vec<String> {
        catalog
            .helm_charts()
            .unwrap_or_default()
            .iter()
            .map(|c| c.app_name().to_string())
            .collect()
    }

    #[test]
    fn test_absent_without_include_injects_full_set_once() {
        let mut c = catalog(false, None, None);
        let outcome = default_application_catalog(&mut c);

        assert_eq!(outcome, DefaultingOutcome::Injected { count: 18 });
        assert_eq!(c.helm_charts().unwrap(), default_charts());

        // second pass is a no-op
        let before = c.clone();
        assert_eq!(default_application_catalog(&mut c), DefaultingOutcome::Unchanged);
        assert_eq!(c.spec, before.spec);
    }

    #[test]
    fn test_absent_helm_block_injects_defaults() {
        let mut c = ApplicationCatalog::new("c1", ApplicationCatalogSpec::default());
        default_application_catalog(&mut c);
        assert_eq!(c.helm_charts().unwrap().len(), default_charts().len());
    }

    #[test]
    fn test_annotation_ignored_without_include() {
        let mut c = catalog(false, None, Some("cert-manager"));
        default_application_catalog(&mut c);
        assert_eq!(c.helm_charts().unwrap().len(), 18);
    }

    #[test]
    fn test_explicit_empty_without_include_is_untouched() {
        let mut c = catalog(false, Some(vec![]), None);
        assert_eq!(default_application_catalog(&mut c), DefaultingOutcome::Unchanged);
        assert_eq!(c.helm_charts(), Some(&[][..]));
    }

    #[test]
    fn test_populated_without_include_is_identity() {
        let user = vec![chart("custom-app", "1.0.0"), chart("argo-cd", "0.0.1")];
        let mut c = catalog(false, Some(user.clone()), None);
        let before = c.clone();

        assert_eq!(default_application_catalog(&mut c), DefaultingOutcome::Unchanged);
        assert_eq!(c.spec, before.spec);
    }

    #[test]
    fn test_include_with_empty_list_gets_defaults() {
        let mut c = catalog(true, Some(vec![]), None);
        default_application_catalog(&mut c);
        assert_eq!(c.helm_charts().unwrap().len(), 18);
    }

    #[test]
    fn test_include_with_filter() {
        let mut c = catalog(true, None, Some("ingress-nginx,cert-manager"));
        default_application_catalog(&mut c);
        assert_eq!(names(&c), ["cert-manager", "ingress-nginx"]);
    }

    #[test]
    fn test_filter_whitespace_insensitive() {
        let mut spaced = catalog(true, None, Some(" ingress-nginx , cert-manager ,argo-cd "));
        let mut tight = catalog(true, None, Some("ingress-nginx,cert-manager,argo-cd"));
        default_application_catalog(&mut spaced);
        default_application_catalog(&mut tight);

        assert_eq!(names(&spaced), ["argo-cd", "cert-manager", "ingress-nginx"]);
        assert_eq!(names(&spaced), names(&tight));
    }

    #[test]
    fn test_filter_drops_unknown_names() {
        let mut c = catalog(true, None, Some("cert-manager,non-existent-app"));
        default_application_catalog(&mut c);
        assert_eq!(names(&c), ["cert-manager"]);

        let mut only_unknown = catalog(true, None, Some("non-existent-app"));
        default_application_catalog(&mut only_unknown);
        assert_eq!(only_unknown.helm_charts(), Some(&[][..]));
    }

    #[test]
    fn test_empty_annotation_means_no_filter() {
        let mut c = catalog(true, None, Some(""));
        default_application_catalog(&mut c);
        assert_eq!(c.helm_charts().unwrap().len(), 18);

        let mut commas = catalog(true, None, Some(" , ,"));
        default_application_catalog(&mut commas);
        assert_eq!(commas.helm_charts().unwrap().len(), 18);
    }

    #[test]
    fn test_merge_user_entries_win_and_sort() {
        let mut custom_argo = chart("argo-cd", "0.0.1");
        custom_argo.default_values_block = Some("custom: true".to_string());
        let user = vec![chart("zz-custom", "1.0.0"), custom_argo.clone(), chart("aaa-custom", "2.0.0")];
        let mut c = catalog(true, Some(user), None);

        let outcome = default_application_catalog(&mut c);
        assert_eq!(outcome, DefaultingOutcome::Synced { defaults: 18, total: 20 });

        let charts = c.helm_charts().unwrap();
        assert_eq!(charts.len(), 20);
        let argo: Vec<_> = charts.iter().filter(|c| c.app_name() == "argo-cd").collect();
        assert_eq!(argo, [&custom_argo]);

        let all = names(&c);
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
        assert_eq!(all.first().unwrap(), "aaa-custom");
        assert_eq!(all.last().unwrap(), "zz-custom");
    }

    #[test]
    fn test_merge_collides_on_app_name_override() {
        let user = ChartConfig {
            metadata: Some(ChartMetadata {
                app_name: "nvidia-gpu-operator".to_string(),
                ..Default::default()
            }),
            ..chart("my-gpu-operator", "1.0.0")
        };
        let mut c = catalog(true, Some(vec![user.clone()]), Some("nvidia-gpu-operator,cert-manager"));
        default_application_catalog(&mut c);

        let charts = c.helm_charts().unwrap();
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[1], user);
    }

    #[test]
    fn test_include_sync_is_idempotent() {
        let mut c = catalog(true, Some(vec![chart("custom-app", "1.0.0")]), Some("argo-cd"));
        default_application_catalog(&mut c);
        let once = c.clone();
        default_application_catalog(&mut c);
        assert_eq!(c.spec, once.spec);
    }

    #[test]
    fn test_parse_include_annotation() {
        assert_eq!(parse_include_annotation(None), None);
        assert_eq!(parse_include_annotation(Some("")), None);
        assert_eq!(
            parse_include_annotation(Some("a, b , c")),
            parse_include_annotation(Some("a,b,c"))
        );
    }

    #[test]
    fn test_validate_include_annotation() {
        assert!(validate_include_annotation("argo-cd, cert-manager").is_empty());
        assert_eq!(
            validate_include_annotation("argo-cd,foo, bar,foo"),
            ["foo", "bar"]
        );
        assert!(validate_include_annotation("").is_empty());
    }
}
