//! Crd command - print the ApplicationCatalog CustomResourceDefinition

use appcat_core::ApplicationCatalog;
use kube::CustomResourceExt;

use crate::error::{CliError, Result};

pub fn run() -> Result<()> {
    let crd = serde_yaml::to_string(&ApplicationCatalog::crd()).map_err(CliError::serialization)?;
    print!("{}", crd);
    Ok(())
}
