//! appcat core - catalog model and pure synchronization logic
//!
//! This crate provides everything that does not need a cluster:
//! - `catalog`: the `ApplicationCatalog` custom resource
//! - `definition`: the downstream `ApplicationDefinition` resource
//! - `resolver`: repository URL and credential precedence
//! - `convert`: chart entry to ApplicationDefinition conversion
//! - `defaults` / `defaulting`: the built-in default set and its injection rules
//! - `ownership`: label-based catalog ownership
//! - `merge`: field-precedence merge of desired into existing definitions

pub mod catalog;
pub mod convert;
pub mod defaulting;
pub mod defaults;
pub mod definition;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod ownership;
pub mod resolver;

pub use catalog::{
    ApplicationCatalog, ApplicationCatalogSpec, ApplicationCatalogStatus, ChartConfig,
    ChartMetadata, ChartVersion, ChartsState, HelmSpec, RepositoryCredentials, RepositorySettings,
    SecretKeySelector,
};
pub use convert::{convert_catalog, convert_chart};
pub use defaulting::{DefaultingOutcome, default_application_catalog, validate_include_annotation};
pub use defaults::{DEFAULT_CATALOG_VERSION, default_chart_names, default_charts, find_default_chart};
pub use definition::{ApplicationDefinition, ApplicationDefinitionSpec, ApplicationVersion};
pub use error::{CoreError, Result};
pub use manifest::{load_catalog, parse_catalog, to_yaml_documents};
pub use merge::{merge_definition, merge_versions, needs_update};
pub use ownership::Ownership;
pub use resolver::{ResolvedRepository, resolve_repository};
