//! Reading and writing catalog manifests

use serde::Serialize;
use std::path::Path;

use crate::catalog::{ApplicationCatalog, GROUP};
use crate::error::{CoreError, Result};

/// Parse an ApplicationCatalog from YAML (or JSON) text
pub fn parse_catalog(content: &str) -> Result<ApplicationCatalog> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;

    let kind = value.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
    if kind != "ApplicationCatalog" {
        return Err(CoreError::InvalidCatalog {
            message: format!("expected kind ApplicationCatalog, found '{}'", kind),
        });
    }
    let api_version = value.get("apiVersion").and_then(|v| v.as_str()).unwrap_or_default();
    if !api_version.starts_with(GROUP) {
        return Err(CoreError::InvalidCatalog {
            message: format!("unsupported apiVersion '{}'", api_version),
        });
    }

    Ok(serde_yaml::from_value(value)?)
}

/// Load an ApplicationCatalog manifest from disk
pub fn load_catalog(path: &Path) -> Result<ApplicationCatalog> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog(&content)
}

/// Render objects as a multi-document YAML stream
pub fn to_yaml_documents<T: Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(item)?);
    }
    Ok(out)
}
