mod args;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use ps_sync::{AutoSync, SyncOutcome, SyncStatus};
use serde_json::json;
use tracing::info;

use crate::{context::Context, print_output};

use self::args::*;

#[derive(Subcommand, Debug)]
pub enum SyncCmd {
	/// Show queue and sync state
	Status,
	/// Run one sync pass now
	Sync,
	/// Probe the API health endpoint
	Online,
	/// Keep syncing in the background until Ctrl+C
	Watch(WatchArgs),
}

pub async fn run(ctx: &Context, cmd: SyncCmd) -> Result<()> {
	match cmd {
		SyncCmd::Status => {
			let status = ctx.service.get_sync_status().await?;
			print_output!(ctx, &status, display_status);
		}
		SyncCmd::Sync => {
			let outcome = ctx.service.sync().await;
			print_output!(ctx, &outcome, display_outcome);
		}
		SyncCmd::Online => {
			let online = ctx.service.is_online().await;
			print_output!(ctx, &json!({ "online": online }), |_| {
				if online {
					println!("{} is reachable", ctx.config.api_url);
				} else {
					println!("{} is unreachable", ctx.config.api_url);
				}
			});
		}
		SyncCmd::Watch(args) => run_watch_mode(ctx, &args).await?,
	}

	Ok(())
}

async fn run_watch_mode(ctx: &Context, args: &WatchArgs) -> Result<()> {
	let period = args.period(ctx.config.auto_sync_interval());

	println!(
		"Syncing with {} every {}s (Press Ctrl+C to stop)...",
		ctx.config.api_url,
		period.as_secs()
	);

	let format = ctx.format;
	let subscription = ctx.service.subscribe(move |status| match format {
		crate::context::OutputFormat::Human => {
			print!("[{}] ", Utc::now().format("%H:%M:%S"));
			display_status(status);
		}
		crate::context::OutputFormat::Json => {
			if let Ok(line) = serde_json::to_string(status) {
				println!("{line}");
			}
		}
	});

	let auto_sync = AutoSync::spawn(Arc::clone(&ctx.service), period);

	tokio::signal::ctrl_c().await?;
	info!("Stopping watch mode");

	auto_sync.stop().await;
	subscription.unsubscribe();

	Ok(())
}

fn display_status(status: &SyncStatus) {
	let last_sync = status.last_sync_at.map_or_else(
		|| "never".to_string(),
		|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
	);

	println!(
		"{} pending ({} failed), {}, last sync {last_sync}",
		status.pending_changes,
		status.failed_changes,
		if status.is_syncing { "syncing" } else { "idle" },
	);
}

fn display_outcome(outcome: &SyncOutcome) {
	if outcome.success {
		println!("Synced {}, failed {}", outcome.synced, outcome.failed);
	} else {
		println!(
			"Sync pass did not run to completion (synced {}, failed {})",
			outcome.synced, outcome.failed
		);
	}
}
