//! convert-helm-values command - turn a legacy values.yaml into CRDs

use std::path::Path;

use kkpmig_convert::{convert, Options};
use kkpmig_core::{DefaultTables, Object};
use miette::{IntoDiagnostic, Result, WrapErr};

use super::read_input;

pub fn run(
    values_file: &Path,
    skip_datacenters: bool,
    skip_presets: bool,
    namespace: &str,
    pause_seeds: bool,
) -> Result<()> {
    let yaml = read_input(values_file)?;

    let options = Options {
        namespace: namespace.to_string(),
        include_seeds: !skip_datacenters,
        include_presets: !skip_presets,
        pause_seeds,
    };

    let objects = convert(&yaml, &options, DefaultTables::get())
        .into_diagnostic()
        .wrap_err("failed to convert the values file")?;

    let stream = Object::to_yaml_stream(&objects).into_diagnostic()?;
    println!("{stream}");

    Ok(())
}
