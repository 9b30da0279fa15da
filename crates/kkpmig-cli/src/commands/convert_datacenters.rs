//! convert-datacenters command - turn a datacenters.yaml into Seeds

use std::path::Path;

use kkpmig_convert::{convert_datacenters, DatacentersMeta};
use kkpmig_core::{Kubeconfig, Object};
use miette::{IntoDiagnostic, Result, WrapErr};

use super::read_input;

pub fn run(
    datacenters_file: &Path,
    kubeconfig_file: Option<&Path>,
    namespace: &str,
    pause_seeds: bool,
) -> Result<()> {
    let yaml = read_input(datacenters_file)?;

    let metas: DatacentersMeta = serde_yaml::from_slice(&yaml)
        .into_diagnostic()
        .wrap_err("failed to parse datacenters.yaml")?;

    let mut kubeconfig = None;
    if let Some(path) = kubeconfig_file {
        let bytes = read_input(path)?;
        kubeconfig = Some(
            Kubeconfig::from_yaml(&bytes)
                .into_diagnostic()
                .wrap_err("failed to parse the kubeconfig")?,
        );
    }

    let objects = convert_datacenters(&metas.datacenters, kubeconfig.as_ref(), namespace, pause_seeds)
        .into_diagnostic()
        .wrap_err("failed to convert datacenters")?;

    let stream = Object::to_yaml_stream(&objects).into_diagnostic()?;
    println!("{stream}");

    Ok(())
}
