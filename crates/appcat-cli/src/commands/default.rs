//! Default command - run admission defaulting on a catalog manifest

use appcat_core::{DefaultingOutcome, default_application_catalog, load_catalog};
use std::path::Path;
use tracing::info;

use super::{OutputFormat, render};
use crate::error::Result;

pub fn run(file: &Path, format: OutputFormat) -> Result<()> {
    let mut catalog = load_catalog(file)?;

    match default_application_catalog(&mut catalog) {
        DefaultingOutcome::Unchanged => info!(file = %file.display(), "catalog left unchanged"),
        outcome => info!(file = %file.display(), outcome = ?outcome, "catalog defaulted"),
    }

    print!("{}", render(&catalog, format)?);
    Ok(())
}
