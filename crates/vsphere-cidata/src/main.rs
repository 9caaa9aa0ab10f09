use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vsphere_provision::ConnectionConfig;
use vsphere_provision::cidata::ImageBuilder;
use vsphere_provision::transport::UserdataTransport;

/// Build cloud-init userdata ISOs and manage them on a vSphere datastore.
///
/// Datastore commands read `VSPHERE_*` connection settings from the
/// environment or a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "vsphere-cidata", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the ISO for a machine and keep it locally.
    Build {
        #[arg(long)]
        name: String,
        /// File holding the userdata.
        #[arg(long)]
        userdata: PathBuf,
        /// Directory the ISO is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Build the ISO for a machine and upload it to the datastore.
    Upload {
        #[arg(long)]
        name: String,
        #[arg(long)]
        userdata: PathBuf,
    },
    /// Delete a machine's ISO from the datastore.
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read userdata from {path}: {source}")]
    ReadUserdata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Provision(#[from] vsphere_provision::Error),
}

async fn read_userdata(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadUserdata {
            path: path.to_path_buf(),
            source,
        })
}

fn transport() -> Result<UserdataTransport, CliError> {
    let config = ConnectionConfig::from_env()?;
    Ok(UserdataTransport::new(Arc::new(config.datastore_client()?)))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Build {
            name,
            userdata,
            out,
        } => {
            let userdata = read_userdata(&userdata).await?;
            let path = ImageBuilder::new(out).build(&userdata, &name).await?.keep();
            tracing::info!(vm = %name, path = %path.display(), "built userdata iso");
            println!("{}", path.display());
        }
        Command::Upload { name, userdata } => {
            let transport = transport()?;
            let userdata = read_userdata(&userdata).await?;
            let image = ImageBuilder::default().build(&userdata, &name).await?;
            let path = transport.upload(image.path(), &name).await?;
            println!("{path}");
        }
        Command::Remove { name } => {
            transport()?.remove(&name).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
