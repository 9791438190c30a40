use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

/// Default ARM endpoint for console and user-settings operations.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// CLI arguments for cloudshell
#[derive(Parser)]
#[command(name = "cloudshell")]
#[command(about = "Relay a cloud shell session into the local terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Attach the local terminal to a provisioned cloud shell session
    Connect(ConnectArgs),
    /// Provision a cloud shell console and print its session URI
    Provision(ProvisionArgs),
    /// Delete the active cloud shell console
    Reset(EndpointArgs),
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Bearer token for the console control plane
    #[arg(long, env = "CLOUD_CONSOLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// URI of the provisioned console session
    #[arg(long, env = "CLOUD_CONSOLE_URI")]
    pub console_uri: String,

    /// File that receives a readiness marker once the socket opens.
    /// Supplying it also switches local input to raw passthrough mode.
    #[arg(long, env = "CLOUDSHELL_TEMP_FILE")]
    pub marker_file: Option<PathBuf>,
}

impl ConnectArgs {
    /// Read the relay context straight from the environment, the way the
    /// editor extension launches this process (no argv beyond the binary).
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("CLOUD_CONSOLE_ACCESS_TOKEN")
            .context("CLOUD_CONSOLE_ACCESS_TOKEN is not set")?;
        let console_uri =
            std::env::var("CLOUD_CONSOLE_URI").context("CLOUD_CONSOLE_URI is not set")?;
        let marker_file = std::env::var("CLOUDSHELL_TEMP_FILE")
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Ok(Self {
            access_token,
            console_uri,
            marker_file,
        })
    }
}

#[derive(Args)]
pub struct ProvisionArgs {
    /// Bearer token for the console control plane
    #[arg(long, env = "CLOUD_CONSOLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// ARM endpoint hosting the console API
    #[arg(long, env = "ARM_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// OS type for the console (linux or windows); defaults to the
    /// portal-preferred OS from the user settings
    #[arg(long)]
    pub os_type: Option<String>,
}

#[derive(Args)]
pub struct EndpointArgs {
    /// Bearer token for the console control plane
    #[arg(long, env = "CLOUD_CONSOLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// ARM endpoint hosting the console API
    #[arg(long, env = "ARM_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}
