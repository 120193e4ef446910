//! Admission-time conflict detection
//!
//! A catalog write is denied when:
//! - two of its entries resolve to the same ApplicationDefinition name
//! - a definition it would produce is owned by another catalog
//! - `includeDefaults` is set and the include annotation names unknown defaults
//!
//! Unmanaged definitions and definitions already owned by the same catalog are
//! fine. The cross-catalog read is not locked; the reconciler catches races.

use appcat_core::defaulting::validate_include_annotation;
use appcat_core::ownership::{self, managed_selector};
use appcat_core::{ApplicationCatalog, default_chart_names};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::store::DefinitionStore;

/// Why a catalog cannot be admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Two entries of the catalog produce the same definition
    Duplicate {
        app_name: String,
        first_chart: String,
        second_chart: String,
    },
    /// The definition is owned by another catalog
    OwnedElsewhere { app_name: String, owner: String },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Duplicate {
                app_name,
                first_chart,
                second_chart,
            } => write!(
                f,
                "ApplicationDefinition {:?} is declared twice in this catalog (duplicate: charts {:?} and {:?} resolve to same appName)",
                app_name, first_chart, second_chart
            ),
            Conflict::OwnedElsewhere { app_name, owner } => write!(
                f,
                "ApplicationDefinition {:?} is already managed by catalog {:?}",
                app_name, owner
            ),
        }
    }
}

/// Admission decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

/// Validates catalogs against the definitions in the cluster
#[derive(Clone)]
pub struct ConflictDetector {
    definitions: Arc<dyn DefinitionStore>,
}

impl ConflictDetector {
    pub fn new(definitions: Arc<dyn DefinitionStore>) -> Self {
        Self { definitions }
    }

    /// Every conflict `catalog` would cause: duplicates first, then foreign
    /// ownership sorted by name
    pub async fn find_conflicts(&self, catalog: &ApplicationCatalog) -> Result<Vec<Conflict>> {
        let catalog_name = catalog.name_any();
        let mut conflicts = Vec::new();

        // app name -> first chart declaring it
        let mut identities: BTreeMap<&str, &str> = BTreeMap::new();
        for chart in catalog.helm_charts().unwrap_or_default() {
            let app_name = chart.app_name();
            match identities.get(app_name) {
                Some(first) => conflicts.push(Conflict::Duplicate {
                    app_name: app_name.to_string(),
                    first_chart: first.to_string(),
                    second_chart: chart.chart_name.clone(),
                }),
                None => {
                    identities.insert(app_name, &chart.chart_name);
                }
            }
        }

        if identities.is_empty() {
            return Ok(conflicts);
        }

        let managed = self.definitions.list(&managed_selector()).await?;
        let owners: BTreeMap<String, ownership::Ownership> = managed
            .iter()
            .map(|def| (def.name_any(), ownership::ownership(&def.metadata)))
            .collect();

        for app_name in identities.keys() {
            if let Some(owner) = owners.get(*app_name).filter(|o| o.conflicts_with(&catalog_name)) {
                debug!(
                    catalog = %catalog_name,
                    definition = %app_name,
                    owner = ?owner.owner(),
                    "definition owned by another catalog"
                );
                conflicts.push(Conflict::OwnedElsewhere {
                    app_name: app_name.to_string(),
                    owner: owner.owner().unwrap_or_default().to_string(),
                });
            }
        }

        Ok(conflicts)
    }

    /// Decide whether `catalog` may be written
    pub async fn validate(&self, catalog: &ApplicationCatalog) -> Result<Verdict> {
        let conflicts = self.find_conflicts(catalog).await?;

        let invalid_names = if catalog.include_defaults() {
            catalog
                .include_annotation()
                .map(validate_include_annotation)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut sections = Vec::new();
        if !conflicts.is_empty() {
            sections.push(conflict_message(&conflicts));
        }
        if !invalid_names.is_empty() {
            sections.push(invalid_include_message(&invalid_names));
        }

        if sections.is_empty() {
            Ok(Verdict::Allowed)
        } else {
            Ok(Verdict::Denied(sections.join("\n\n")))
        }
    }
}

/// Human readable denial listing every conflict and how to resolve it
pub fn conflict_message(conflicts: &[Conflict]) -> String {
    let mut message = String::from("ApplicationCatalog conflicts detected:\n");
    for conflict in conflicts {
        message.push_str(&format!("  - {}\n", conflict));
    }
    message.push_str(
        "\nTo resolve this conflict, either:\n  \
         1. Remove the conflicting chart from this catalog\n  \
         2. Use a different appName in metadata.appName for the chart\n  \
         3. Delete the other catalog or remove the chart from it first",
    );
    message
}

/// Denial for unknown names in the include annotation
pub fn invalid_include_message(invalid: &[String]) -> String {
    format!(
        "invalid chart names in annotation {}: {}. Valid names are: {}",
        appcat_core::catalog::INCLUDE_ANNOTATION,
        invalid.join(", "),
        default_chart_names().join(", ")
    )
}
