//! portfwd CLI - Discover cluster services and run port-forward profiles
//!
//! A command-line tool for listing services, spotting port conflicts,
//! saving profiles and forwarding every service of a profile at once.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::Globals;

#[derive(Parser)]
#[command(name = "portfwd")]
#[command(author, version, about = "Discover cluster services and run port-forward profiles")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes context (falls back to the profile file's context)
    #[arg(short, long, global = true, env = "PORTFWD_CONTEXT", default_value = "")]
    context: String,

    /// Kubernetes namespace (falls back to the profile file's namespace)
    #[arg(short, long, global = true, env = "PORTFWD_NAMESPACE", default_value = "")]
    namespace: String,

    /// Profile file (default: ~/.portfwd.yaml)
    #[arg(long, global = true, env = "PORTFWD_CONFIG")]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all services (and their ports) in a context + namespace
    ///
    /// Reports ports declared by more than one service.
    Discover {
        /// Always exit with status 0, even when ports conflict
        #[arg(short, long)]
        quiet: bool,

        /// Save the discovered services as a profile
        #[arg(short, long)]
        save: bool,

        /// Name of the saved profile (default: new-profile-<timestamp>)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show saved profiles, or create the profile file
    Profiles {
        #[command(subcommand)]
        action: Option<ProfilesAction>,

        /// Create a profile file with an example profile
        #[arg(short, long)]
        init: bool,

        /// Together with --init, replace an existing profile file
        #[arg(short, long)]
        overwrite: bool,
    },

    /// List available contexts
    Contexts,

    /// List namespaces of the current (or --context) context
    #[command(alias = "ns")]
    Namespaces,
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// Forward every service of a profile until interrupted
    Run {
        /// Profile to run (default: the file's default-profile)
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let globals = Globals::new(cli.context, cli.namespace, cli.config, cli.json)?;

    match cli.command {
        Commands::Discover { quiet, save, name } => {
            commands::discover::run(&globals, quiet, save, name).await
        }
        Commands::Profiles {
            action: Some(ProfilesAction::Run { profile }),
            ..
        } => commands::run::run(&globals, profile).await,
        Commands::Profiles {
            action: None,
            init,
            overwrite,
        } => commands::profiles::show(&globals, init, overwrite).await,
        Commands::Contexts => commands::cluster::contexts(&globals).await,
        Commands::Namespaces => commands::cluster::namespaces(&globals).await,
    }
}
