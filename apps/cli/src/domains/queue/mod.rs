mod args;

use anyhow::{bail, Result};
use clap::Subcommand;
use ps_sync::{PendingChange, MAX_RETRY_ATTEMPTS};

use crate::{context::Context, print_output};

use self::args::*;

#[derive(Subcommand, Debug)]
pub enum QueueCmd {
	/// Queue a change for the next sync pass
	Enqueue(EnqueueArgs),
	/// List queued changes, oldest first
	List(ListArgs),
	/// Drop every queued change, including ones still being retried
	Clear(ClearArgs),
	/// Drop changes that ran out of retries
	ClearFailed,
}

pub async fn run(ctx: &Context, cmd: QueueCmd) -> Result<()> {
	match cmd {
		QueueCmd::Enqueue(args) => {
			let (kind, entity, data) = args.to_change()?;
			let change = ctx.service.add_pending_change(kind, entity, data).await?;

			print_output!(ctx, &change, |c: &PendingChange| {
				println!("Queued {} {} as {}", c.kind, c.entity, c.id);
			});
		}
		QueueCmd::List(args) => {
			let changes = ctx
				.service
				.pending_changes()
				.await?
				.into_iter()
				.filter(|change| !args.failed || change.has_exhausted_retries())
				.collect::<Vec<_>>();

			print_output!(ctx, &changes, |changes: &Vec<PendingChange>| {
				if changes.is_empty() {
					println!("No pending changes");
				}
				for change in changes {
					display_change(change);
				}
			});
		}
		QueueCmd::Clear(args) => {
			let pending = ctx.service.pending_changes().await?.len();
			if pending > 0 && !args.yes {
				bail!("Refusing to drop {pending} pending change(s) without --yes");
			}

			ctx.service.clear_pending_changes().await?;
			println!("Cleared {pending} pending change(s)");
		}
		QueueCmd::ClearFailed => {
			let before = ctx.service.get_sync_status().await?.failed_changes;
			ctx.service.clear_failed_changes().await?;
			println!("Cleared {before} failed change(s)");
		}
	}

	Ok(())
}

fn display_change(change: &PendingChange) {
	println!(
		"- {} {} {} queued {} attempts {}/{}",
		change.id,
		change.kind,
		change.entity,
		change.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
		change.attempts,
		MAX_RETRY_ATTEMPTS
	);
	if let Some(error) = &change.last_error {
		println!("    last error: {error}");
	}
}
