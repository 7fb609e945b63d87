mod context;
mod domains;
mod util;

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use ps_config::SyncConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
	context::{Context, OutputFormat},
	domains::{queue::QueueCmd, sync::SyncCmd},
};

#[derive(Parser, Debug)]
#[command(name = "pestscan", about = "PestScan offline sync client")]
struct Cli {
	/// Path to the PestScan data directory
	#[arg(long)]
	data_dir: Option<PathBuf>,

	/// Output format
	#[arg(long, value_enum, default_value = "human")]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	#[command(flatten)]
	Queue(QueueCmd),
	#[command(flatten)]
	Sync(SyncCmd),
}

/// Logs go to `<data dir>/logs/pestscan.log` and, less verbosely, to stderr.
fn init_logging(config: &SyncConfig) -> Result<()> {
	let logs_dir = config.logs_dir();
	std::fs::create_dir_all(&logs_dir)
		.with_context(|| format!("Failed to create {}", logs_dir.display()))?;

	let file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(logs_dir.join("pestscan.log"))?;

	let file_layer = fmt::layer()
		.with_writer(Mutex::new(file))
		.with_ansi(false)
		.with_target(true)
		.with_line_number(true);

	let console_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(false);

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("{},ps_sync=debug", config.log_level)));

	tracing_subscriber::registry()
		.with(filter)
		.with(file_layer)
		.with(console_layer)
		.init();

	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = match cli.data_dir {
		Some(data_dir) => SyncConfig::load_from(&data_dir)?,
		None => SyncConfig::load()?,
	};

	init_logging(&config)?;

	let ctx = Context::open(config, cli.format).await?;

	match cli.command {
		Commands::Queue(cmd) => domains::queue::run(&ctx, cmd).await,
		Commands::Sync(cmd) => domains::sync::run(&ctx, cmd).await,
	}
}
