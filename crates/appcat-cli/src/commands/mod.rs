//! Subcommand implementations

pub mod convert;
pub mod crd;
pub mod default;
pub mod defaults;
pub mod manager;
pub mod webhook;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::{CliError, Result};

/// Output format of the offline commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Render a single object
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(CliError::serialization),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(CliError::serialization),
    }
}

/// Render a list: a YAML document stream or a JSON array
pub fn render_all<T: Serialize>(items: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(appcat_core::to_yaml_documents(items)?),
        OutputFormat::Json => render(&items, format),
    }
}

/// Install the process-wide rustls crypto provider used by the kube client and TLS server
pub fn install_crypto_provider() -> Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| CliError::config("failed to install the rustls crypto provider"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_json_is_array() {
        let out = render_all(&["a", "b"], OutputFormat::Json).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, ["a", "b"]);
    }

    #[test]
    fn test_render_all_yaml_is_stream() {
        let out = render_all(&["a", "b"], OutputFormat::Yaml).unwrap();
        assert_eq!(out, "---\na\n---\nb\n");
    }
}
