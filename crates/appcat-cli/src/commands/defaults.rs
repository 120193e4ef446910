//! Defaults command - print the built-in default charts

use appcat_core::{DEFAULT_CATALOG_VERSION, default_chart_names, default_charts};

use super::{OutputFormat, render, render_all};
use crate::error::Result;

pub fn run(names_only: bool, format: OutputFormat) -> Result<()> {
    if names_only {
        let names = default_chart_names();
        match format {
            OutputFormat::Yaml => names.iter().for_each(|name| println!("{}", name)),
            OutputFormat::Json => print!("{}", render(&names, format)?),
        }
        return Ok(());
    }

    if format == OutputFormat::Yaml {
        println!("# default catalog {}", DEFAULT_CATALOG_VERSION);
    }
    print!("{}", render_all(default_charts(), format)?);
    Ok(())
}
