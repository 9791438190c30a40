use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cloudshell_api::{provision_console, ConsoleClient, ConsoleError, OsType};
use cloudshell_relay::{connect_terminal, RelayOutcome};

mod cli;

use cli::{Cli, Commands, ConnectArgs, EndpointArgs, ProvisionArgs, DEFAULT_ENDPOINT};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = match cli.command {
        Some(command) => Ok(command),
        // Bare invocation: the editor extension launches this process with
        // context in the environment only.
        None => ConnectArgs::from_env().map(Commands::Connect),
    };

    let result = match command {
        Ok(Commands::Connect(args)) => run_connect(args).await,
        Ok(Commands::Provision(args)) => run_provision(args).await,
        Ok(Commands::Reset(args)) => run_reset(args).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}

/// Attach the local terminal to the console session and relay until the
/// socket closes. Exits 0 on a clean close; an error close is reported and
/// left to the caller.
async fn run_connect(args: ConnectArgs) -> Result<()> {
    // Raw passthrough only when another process watches the marker file;
    // otherwise keep the local terminal's line discipline.
    let raw_mode = args.marker_file.is_some();
    if raw_mode {
        crossterm::terminal::enable_raw_mode().context("failed to enable raw mode")?;
    }

    let outcome = relay_session(&args).await;

    if raw_mode {
        let _ = crossterm::terminal::disable_raw_mode();
    }

    match outcome? {
        Some(RelayOutcome::CleanClose) => std::process::exit(0),
        Some(RelayOutcome::ErrorClose) => {
            eprintln!(
                "{}",
                "Cloud shell session ended after a socket error.".yellow()
            );
            Ok(())
        }
        // Soft connect failure, already logged by the relay.
        None => Ok(()),
    }
}

async fn relay_session(args: &ConnectArgs) -> Result<Option<RelayOutcome>> {
    let client = ConsoleClient::new(args.access_token.clone(), DEFAULT_ENDPOINT.to_string());
    let relay = match connect_terminal(client, &args.console_uri, args.marker_file.as_deref())
        .await?
    {
        Some(relay) => relay,
        None => return Ok(None),
    };
    let outcome = relay.run(tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(Some(outcome))
}

/// Provision a console and print its session URI. A deployment OS-type
/// conflict is retried once with the alternate OS type.
async fn run_provision(args: ProvisionArgs) -> Result<()> {
    let client = ConsoleClient::new(args.access_token.clone(), args.endpoint.clone());

    let settings = client
        .get_user_settings()
        .await?
        .context("no cloud shell user settings found; set up Cloud Shell in the portal first")?;

    let os_type = match &args.os_type {
        Some(value) => OsType::from_str(value)
            .with_context(|| format!("unknown OS type '{value}' (expected linux or windows)"))?,
        None => OsType::from_str(&settings.preferred_os_type).unwrap_or(OsType::Linux),
    };

    let uri = match provision_console(&client, &settings, os_type).await {
        Ok(uri) => uri,
        Err(ConsoleError::OsTypeConflict) => {
            let other = os_type.toggled();
            eprintln!(
                "{}",
                format!("A {os_type} console conflicts with the existing deployment; retrying as {other}.")
                    .yellow()
            );
            provision_console(&client, &settings, other).await?
        }
        Err(err) => return Err(err.into()),
    };

    println!("{uri}");
    Ok(())
}

async fn run_reset(args: EndpointArgs) -> Result<()> {
    let client = ConsoleClient::new(args.access_token.clone(), args.endpoint.clone());
    client.reset_console().await?;
    println!("{}", "Cloud shell console deleted.".green());
    Ok(())
}
