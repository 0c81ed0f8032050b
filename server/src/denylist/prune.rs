//! Periodic denylist pruner.
//!
//! Deletes denylist rows whose `expires_at` has passed. Deletion is silent:
//! locks drop their own entries at the embedded `exp`, so no command needs
//! to follow the sweep.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::scheduler::Task;
use crate::prelude::*;

/// Scheduled sweep over expired denylist entries
#[derive(Clone, Debug)]
pub struct DenylistPruneTask;

impl DenylistPruneTask {
	pub fn new() -> Arc<Self> {
		Arc::new(Self)
	}
}

#[async_trait]
impl Task<App> for DenylistPruneTask {
	fn kind(&self) -> &'static str {
		"denylist.prune"
	}

	async fn run(&self, app: &App) -> ClResult<()> {
		let removed = prune_now(app).await?;
		if removed > 0 {
			info!("pruned {} expired denylist entries", removed);
		}
		Ok(())
	}
}

/// One sweep, on demand. Returns the number of rows removed.
pub async fn prune_now(app: &App) -> ClResult<u32> {
	app.denylist_adapter.delete_expired(Timestamp::now()).await
}

// vim: ts=4
