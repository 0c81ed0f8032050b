//! Scheduler subsystem. Runs registered background tasks on a fixed
//! interval until shutdown.
//!
//! Deliberately small: the access core has exactly one class of recurring
//! work (sweeps), so there is no persistence, no dependency graph and no
//! cron grammar here. A task that fails is logged and tried again on the
//! next tick.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{ClResult, Error};
use tracing::{debug, error, info};

#[async_trait]
pub trait Task<S>: Debug + Send + Sync {
	fn kind(&self) -> &'static str;
	async fn run(&self, state: &S) -> ClResult<()>;
}

pub struct Scheduler<S> {
	tasks: Mutex<Vec<(Duration, Arc<dyn Task<S>>)>>,
	handles: Mutex<Vec<JoinHandle<()>>>,
	shutdown_tx: watch::Sender<bool>,
	shutdown_rx: watch::Receiver<bool>,
}

impl<S: Clone + Send + Sync + 'static> Scheduler<S> {
	pub fn new() -> Arc<Self> {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		Arc::new(Self {
			tasks: Mutex::new(Vec::new()),
			handles: Mutex::new(Vec::new()),
			shutdown_tx,
			shutdown_rx,
		})
	}

	/// Registers a task to run every `interval`, first run one interval
	/// after `start`
	pub fn every(&self, interval: Duration, task: Arc<dyn Task<S>>) -> ClResult<()> {
		let mut tasks =
			self.tasks.lock().map_err(|_| Error::Internal("scheduler task lock poisoned".into()))?;
		tasks.push((interval, task));
		Ok(())
	}

	/// Spawns one loop per registered task
	pub fn start(&self, state: S) {
		let registered = match self.tasks.lock() {
			Ok(mut tasks) => std::mem::take(&mut *tasks),
			Err(_) => {
				error!("scheduler task lock poisoned, no tasks started");
				return;
			}
		};

		for (interval, task) in registered {
			info!("scheduling task {} every {}s", task.kind(), interval.as_secs());
			let state = state.clone();
			let mut shutdown = self.shutdown_rx.clone();
			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							if let Err(err) = task.run(&state).await {
								error!("task {} failed: {}", task.kind(), err);
							}
						}
						_ = shutdown.changed() => {
							debug!("task {} stopping", task.kind());
							break;
						}
					}
				}
			});
			if let Ok(mut handles) = self.handles.lock() {
				handles.push(handle);
			}
		}
	}

	/// Stops every task loop and waits for them to finish
	pub async fn stop(&self) {
		let _ = self.shutdown_tx.send(true);
		let handles = match self.handles.lock() {
			Ok(mut handles) => std::mem::take(&mut *handles),
			Err(_) => Vec::new(),
		};
		for handle in handles {
			if let Err(err) = handle.await {
				error!("task loop join failed: {}", err);
			}
		}
	}
}


// vim: ts=4
