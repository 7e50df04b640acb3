mod archive;
mod target;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::target::Target;

#[derive(Debug, Parser)]
#[command(name = "skyarchive")]
#[command(about = "Archive a Bluesky profile to CSV and a static HTML timeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a profile's full feed and write the archive
    Archive {
        /// Handle or DID to archive (prompted for when omitted)
        target: Option<String>,
        /// Parent directory for the archive folder
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Resolve a handle or DID and print the profile summary
    Resolve {
        /// Handle or DID to look up
        target: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = skyarchive_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Archive { target, output_dir }) => {
            let target = match target {
                Some(raw) => Target::parse(&raw)?,
                None => target::prompt_for_target().await?,
            };
            let output_root = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let summary = archive::run_archive(&config, &target, &output_root).await?;
            summary.print();
        }
        Some(Commands::Resolve { target }) => {
            let target = Target::parse(&target)?;
            archive::run_resolve(&config, &target).await?;
        }
        None => {
            println!("nothing to do; try `skyarchive archive <handle>` or `skyarchive --help`");
        }
    }

    Ok(())
}
