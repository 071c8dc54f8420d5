use std::{io, time::Duration};

use a4c_cli::{
    RunOptions,
    cli::{Command, ConnectionOverrides},
    run,
};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "a4c", version, about = "Orchestration platform command line")]
struct Cli {
    /// Platform URL (default: http://127.0.0.1:8088)
    #[arg(long, global = true, env = "A4C_URL")]
    url: Option<String>,

    /// Delay between two status polls
    #[arg(long, global = true, default_value = "5s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Give up on any deployment, undeployment or workflow after this long
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Print one JSON object per line instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = RunOptions {
        connection: ConnectionOverrides {
            url: cli.url,
            insecure: cli.insecure,
        },
        poll_interval: cli.interval,
        deadline: cli.deadline,
        json: cli.json,
    };
    run(&cli.command, &options, io::stdout().lock())
}
