//! appcat - keeps ApplicationDefinitions in sync with ApplicationCatalogs

use clap::{ArgAction, Parser, Subcommand};
use miette::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;
mod error;
mod logging;

use commands::OutputFormat;
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "appcat")]
#[command(version)]
#[command(about = "Application catalog manager for Kubermatic", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    log_debug: bool,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the catalog controller
    Manager {
        /// Full resync period of a healthy catalog (0 disables)
        #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
        reconciliation_interval: std::time::Duration,

        /// Deadline of a single reconcile pass
        #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
        reconcile_timeout: std::time::Duration,

        /// Only reconcile while holding the leader lease
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        leader_elect: bool,

        /// Namespace of the leader lease
        #[arg(long, default_value = appcat_kube::leader::DEFAULT_LEASE_NAMESPACE)]
        leader_election_namespace: String,

        /// Name of the leader lease
        #[arg(long, default_value = appcat_kube::leader::DEFAULT_LEASE_NAME)]
        leader_election_id: String,

        /// Address of the health probe endpoint
        #[arg(long, default_value = "127.0.0.1:8085")]
        health_probe_address: SocketAddr,
    },

    /// Serve the admission webhooks
    Webhook {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:9443")]
        listen_address: SocketAddr,

        /// Directory holding tls.crt and tls.key
        #[arg(long, default_value = "/tmp/k8s-webhook-server/serving-certs")]
        cert_dir: PathBuf,

        /// Deadline of a validation request
        #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
        admission_timeout: std::time::Duration,
    },

    /// Print the built-in default charts
    Defaults {
        /// Print only the chart names
        #[arg(long)]
        names: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Apply admission defaulting to a catalog manifest
    Default {
        /// ApplicationCatalog manifest
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Print the ApplicationDefinitions a catalog manifest produces
    Convert {
        /// ApplicationCatalog manifest
        file: PathBuf,

        /// Convert the manifest as written, without admission defaulting
        #[arg(long)]
        no_defaults: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Print the ApplicationCatalog CRD
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.log_debug, cli.log_format);

    match cli.command {
        Commands::Manager {
            reconciliation_interval,
            reconcile_timeout,
            leader_elect,
            leader_election_namespace,
            leader_election_id,
            health_probe_address,
        } => {
            commands::install_crypto_provider()?;
            commands::manager::run(commands::manager::ManagerOptions {
                reconciliation_interval,
                reconcile_timeout,
                leader_elect,
                leader_election_namespace,
                leader_election_id,
                health_probe_address,
            })
            .await?
        }

        Commands::Webhook {
            listen_address,
            cert_dir,
            admission_timeout,
        } => {
            commands::install_crypto_provider()?;
            commands::webhook::run(listen_address, &cert_dir, admission_timeout).await?
        }

        Commands::Defaults { names, output } => commands::defaults::run(names, output)?,

        Commands::Default { file, output } => commands::default::run(&file, output)?,

        Commands::Convert {
            file,
            no_defaults,
            output,
        } => commands::convert::run(&file, !no_defaults, output)?,

        Commands::Crd => commands::crd::run()?,
    }

    Ok(())
}
