use std::time::Duration;

use clap::Args;

#[derive(Args, Debug)]
pub struct WatchArgs {
	/// Seconds between passes, overriding the configured interval
	#[arg(long)]
	pub interval: Option<u64>,
}

impl WatchArgs {
	pub fn period(&self, configured: Duration) -> Duration {
		self.interval
			.map_or(configured, |secs| Duration::from_secs(secs.max(1)))
	}
}
