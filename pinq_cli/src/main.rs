use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Override the pending-pin queue directory
    #[arg(long, value_name = "PATH")]
    pending_dir: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and retry pins that exhausted their upload attempts
    Pending {
        #[command(subcommand)]
        cmd: PendingCmd,
    },
    /// Pin a payload to the remote storage service
    Pin {
        #[command(subcommand)]
        cmd: PinCmd,
    },
    /// Summarize the pending-pin backlog to the issue tracker and/or
    /// chat webhook
    Notify,
}

#[derive(Subcommand)]
enum PendingCmd {
    /// Print every pending record's path and JSON body
    List,
    /// Retry one record by file name (e.g. "asset.bin.pending.json");
    /// the record is removed if the pin succeeds
    Retry {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Retry every record currently in the queue, sequentially
    RetryAll,
}

#[derive(Subcommand)]
enum PinCmd {
    /// Pin the JSON document read from FILE
    Json {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Upload and pin a local file
    File {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // Config lives under the platform config dir (~/.config/pinq/config.toml
    // on Linux); a missing file just means defaults.
    let dirs =
        ProjectDirs::from("", "", "pinq").context("failed to determine config directory path")?;
    let config = config::PinqConfig::load(&dirs.config_dir().join("config.toml"))?;

    cmd::run_command(&config, cli.pending_dir, cli.cmd).await
}
