use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use log::{error, info};

use xtftp::tftp::client::{self, ClientConfig, Operation};

/// TFTP client program
#[derive(Parser, Debug)]
#[command(name = "xtftp", version, about)]
struct Cli {
    /// Server address or host name
    host: String,

    /// get or put a file
    #[arg(value_enum)]
    operation: Operation,

    /// Name of file to transfer
    filename: String,

    /// Server port number [default: 69]
    #[arg(short, long)]
    port: Option<u16>,

    /// Time to wait for each reply, e.g. "5s" or "500ms" [default: 5s]
    #[arg(short, long, value_parser = humantime_serde::re::humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Retransmissions per packet before giving up [default: 3]
    #[arg(short, long)]
    retries: Option<u32>,

    /// Local file path (defaults to FILENAME)
    #[arg(short, long)]
    local: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .merge_cli(cli.port, cli.timeout, cli.retries);

    let summary = client::run(
        &cli.host,
        cli.operation,
        &cli.filename,
        cli.local.as_deref(),
        config,
    )?;

    info!(
        "File transfer completed: {} bytes, {} blocks, {} retransmits",
        summary.bytes, summary.blocks, summary.retransmits
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    init_logger(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
