//! App state type

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::signer::Signer;
use crate::core::scheduler::Scheduler;
use crate::denylist::cascade::{self, CascadeEvent, CascadeListener, CascadeSender};
use crate::denylist::prune::DenylistPruneTask;
use crate::denylist_adapter::DenylistAdapter;
use crate::directory_adapter::DirectoryAdapter;
use crate::gateway_adapter::{GatewayAdapter, LogGatewayAdapter};
use crate::prelude::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Operator configuration of the access core
#[derive(Clone, Debug)]
pub struct AppConfig {
	pub route_pass_ttl_hours: u32,
	pub fallback_iat_skew_seconds: u32,
	pub prune_interval_seconds: u32,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self { route_pass_ttl_hours: 24, fallback_iat_skew_seconds: 10, prune_interval_seconds: 300 }
	}
}

impl AppConfig {
	pub fn route_pass_ttl_seconds(&self) -> i64 {
		i64::from(self.route_pass_ttl_hours) * 3600
	}
}

pub struct AppState {
	pub config: AppConfig,
	pub signer: Signer,
	pub scheduler: Arc<Scheduler<App>>,

	pub directory_adapter: Arc<dyn DirectoryAdapter>,
	pub denylist_adapter: Arc<dyn DenylistAdapter>,
	pub gateway_adapter: Arc<dyn GatewayAdapter>,

	cascade_tx: Mutex<Option<CascadeSender>>,
	cascade_listener: Mutex<Option<CascadeListener>>,
	cascade_handle: Mutex<Option<JoinHandle<()>>>,
}

pub type App = Arc<AppState>;

impl AppState {
	/// Queues a cascade event for the single-writer consumer
	pub async fn dispatch(&self, event: CascadeEvent) -> ClResult<()> {
		let tx = self
			.cascade_tx
			.lock()
			.map_err(|_| Error::Internal("cascade sender lock poisoned".into()))?
			.clone();
		let Some(tx) = tx else {
			return Err(Error::ServiceUnavailable("cascade stream is shut down".into()));
		};
		tx.send_async(event)
			.await
			.map_err(|_| Error::ServiceUnavailable("cascade stream is closed".into()))
	}
}

/// Starts the cascade consumer and the background scheduler
pub fn serve(app: &App) -> ClResult<()> {
	let listener = app
		.cascade_listener
		.lock()
		.map_err(|_| Error::Internal("cascade listener lock poisoned".into()))?
		.take()
		.ok_or_else(|| Error::Internal("serve called more than once".into()))?;

	let handle = tokio::spawn(listener.run(app.clone()));
	*app.cascade_handle
		.lock()
		.map_err(|_| Error::Internal("cascade handle lock poisoned".into()))? = Some(handle);

	app.scheduler.start(app.clone());
	info!("BluLok access core v{} serving", VERSION);
	Ok(())
}

/// Drains the cascade queue, then stops the background scheduler
pub async fn shutdown(app: &App) -> ClResult<()> {
	info!("shutting down");
	// dropping the sender lets the consumer drain the queue and exit
	app.cascade_tx
		.lock()
		.map_err(|_| Error::Internal("cascade sender lock poisoned".into()))?
		.take();

	let handle = app
		.cascade_handle
		.lock()
		.map_err(|_| Error::Internal("cascade handle lock poisoned".into()))?
		.take();
	if let Some(handle) = handle {
		handle.await?;
	}

	app.scheduler.stop().await;
	info!("shutdown complete");
	Ok(())
}

pub struct AppBuilder {
	config: AppConfig,
	operator_private_key_b64: Option<Box<str>>,
	operator_public_key_b64: Option<Box<str>>,
	directory_adapter: Option<Arc<dyn DirectoryAdapter>>,
	denylist_adapter: Option<Arc<dyn DenylistAdapter>>,
	gateway_adapter: Option<Arc<dyn GatewayAdapter>>,
}

impl AppBuilder {
	pub fn new() -> Self {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder {
			config: AppConfig::default(),
			operator_private_key_b64: None,
			operator_public_key_b64: None,
			directory_adapter: None,
			denylist_adapter: None,
			gateway_adapter: None,
		}
	}

	// Opts
	pub fn operator_keys(
		&mut self,
		private_key_b64: impl Into<Box<str>>,
		public_key_b64: impl Into<Box<str>>,
	) -> &mut Self {
		self.operator_private_key_b64 = Some(private_key_b64.into());
		self.operator_public_key_b64 = Some(public_key_b64.into());
		self
	}
	pub fn route_pass_ttl_hours(&mut self, hours: u32) -> &mut Self {
		self.config.route_pass_ttl_hours = hours;
		self
	}
	pub fn fallback_iat_skew_seconds(&mut self, seconds: u32) -> &mut Self {
		self.config.fallback_iat_skew_seconds = seconds;
		self
	}
	pub fn prune_interval_seconds(&mut self, seconds: u32) -> &mut Self {
		self.config.prune_interval_seconds = seconds;
		self
	}

	// Adapters
	pub fn directory_adapter(&mut self, adapter: Arc<dyn DirectoryAdapter>) -> &mut Self {
		self.directory_adapter = Some(adapter);
		self
	}
	pub fn denylist_adapter(&mut self, adapter: Arc<dyn DenylistAdapter>) -> &mut Self {
		self.denylist_adapter = Some(adapter);
		self
	}
	pub fn gateway_adapter(&mut self, adapter: Arc<dyn GatewayAdapter>) -> &mut Self {
		self.gateway_adapter = Some(adapter);
		self
	}

	/// Validates configuration and assembles the app container.
	///
	/// Startup aborts on missing adapters or key material that fails the
	/// 32-byte Ed25519 shape check.
	pub fn build(self) -> ClResult<App> {
		let Some(private_key) = self.operator_private_key_b64 else {
			error!("FATAL: No operator private key configured");
			return Err(Error::ConfigError("No operator private key configured".into()));
		};
		let Some(public_key) = self.operator_public_key_b64 else {
			error!("FATAL: No operator public key configured");
			return Err(Error::ConfigError("No operator public key configured".into()));
		};
		let signer = Signer::new(&private_key, &public_key).inspect_err(|err| {
			error!("FATAL: Operator key validation failed: {}", err);
		})?;

		let Some(directory_adapter) = self.directory_adapter else {
			error!("FATAL: No directory adapter configured");
			return Err(Error::ConfigError("No directory adapter configured".into()));
		};
		let Some(denylist_adapter) = self.denylist_adapter else {
			error!("FATAL: No denylist adapter configured");
			return Err(Error::ConfigError("No denylist adapter configured".into()));
		};
		let gateway_adapter =
			self.gateway_adapter.unwrap_or_else(|| Arc::new(LogGatewayAdapter));

		let (cascade_tx, cascade_listener) = cascade::channel();

		let scheduler: Arc<Scheduler<App>> = Scheduler::new();
		scheduler.every(
			Duration::from_secs(u64::from(self.config.prune_interval_seconds)),
			DenylistPruneTask::new(),
		)?;

		Ok(Arc::new(AppState {
			config: self.config,
			signer,
			scheduler,
			directory_adapter,
			denylist_adapter,
			gateway_adapter,
			cascade_tx: Mutex::new(Some(cascade_tx)),
			cascade_listener: Mutex::new(Some(cascade_listener)),
			cascade_handle: Mutex::new(None),
		}))
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
