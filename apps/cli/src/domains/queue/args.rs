use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ps_sync::{ChangeKind, Entity};
use serde_json::Value;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChangeKindArg {
	Create,
	Update,
	Delete,
}

impl From<ChangeKindArg> for ChangeKind {
	fn from(kind: ChangeKindArg) -> Self {
		match kind {
			ChangeKindArg::Create => Self::Create,
			ChangeKindArg::Update => Self::Update,
			ChangeKindArg::Delete => Self::Delete,
		}
	}
}

#[derive(Args, Debug)]
pub struct EnqueueArgs {
	/// Operation to replay against the API
	#[arg(value_enum)]
	pub kind: ChangeKindArg,

	/// Record type (OBSERVATION, SESSION, PHOTO)
	pub entity: String,

	/// JSON payload; updates and deletes need an "id" field
	#[arg(long, default_value = "{}")]
	pub data: String,
}

impl EnqueueArgs {
	pub fn to_change(&self) -> Result<(ChangeKind, Entity, Value)> {
		let data = serde_json::from_str(&self.data).context("--data must be valid JSON")?;

		Ok((
			self.kind.into(),
			Entity::from(self.entity.to_uppercase()),
			data,
		))
	}
}

#[derive(Args, Debug)]
pub struct ListArgs {
	/// Only show changes that ran out of retries
	#[arg(long, default_value_t = false)]
	pub failed: bool,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
	/// Drop the queue without asking
	#[arg(long, default_value_t = false)]
	pub yes: bool,
}
