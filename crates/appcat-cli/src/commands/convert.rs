//! Convert command - print the ApplicationDefinitions a catalog produces

use appcat_core::{convert_catalog, default_application_catalog, load_catalog};
use std::path::Path;
use tracing::debug;

use super::{OutputFormat, render_all};
use crate::error::Result;

/// Convert the catalog in `file`, defaulting it first unless `apply_defaults` is false
pub fn run(file: &Path, apply_defaults: bool, format: OutputFormat) -> Result<()> {
    let mut catalog = load_catalog(file)?;
    if apply_defaults {
        let outcome = default_application_catalog(&mut catalog);
        debug!(outcome = ?outcome, "applied defaulting before conversion");
    }

    let definitions = convert_catalog(&catalog);
    print!("{}", render_all(&definitions, format)?);
    Ok(())
}
