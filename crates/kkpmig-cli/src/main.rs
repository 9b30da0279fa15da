//! kkpmig CLI - one-time migration of legacy Helm-based installations

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "kkpmig")]
#[command(version)]
#[command(about = "Converts a legacy Helm-based installation into CRD-based configuration", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a legacy datacenters.yaml into Seed resources
    ConvertDatacenters {
        /// Path to the datacenters.yaml ("-" reads from stdin)
        datacenters_file: PathBuf,

        /// Multi-context kubeconfig to split into per-seed Secrets
        #[arg(long)]
        kubeconfig: Option<PathBuf>,

        /// Namespace stamped onto all emitted resources
        #[arg(short, long, default_value = "kubermatic")]
        namespace: String,

        /// Do not mark the Seeds as paused
        #[arg(long)]
        unpause_seeds: bool,
    },

    /// Convert a legacy Helm values.yaml into the new resource set
    ConvertHelmValues {
        /// Path to the values.yaml ("-" reads from stdin)
        values_file: PathBuf,

        /// Skip the embedded datacenters (no Seeds are emitted)
        #[arg(long)]
        skip_datacenters: bool,

        /// Skip the embedded presets
        #[arg(long)]
        skip_presets: bool,

        /// Namespace stamped onto all emitted resources
        #[arg(short, long, default_value = "kubermatic")]
        namespace: String,

        /// Do not mark the Seeds as paused
        #[arg(long)]
        unpause_seeds: bool,
    },
}

fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.debug);

    match cli.command {
        Commands::ConvertDatacenters {
            datacenters_file,
            kubeconfig,
            namespace,
            unpause_seeds,
        } => commands::convert_datacenters::run(
            &datacenters_file,
            kubeconfig.as_deref(),
            &namespace,
            !unpause_seeds,
        ),

        Commands::ConvertHelmValues {
            values_file,
            skip_datacenters,
            skip_presets,
            namespace,
            unpause_seeds,
        } => commands::convert_helm_values::run(
            &values_file,
            skip_datacenters,
            skip_presets,
            &namespace,
            !unpause_seeds,
        ),
    }
}

/// Logs go to stderr; stdout is reserved for the YAML stream.
fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
