//! Cascade listener.
//!
//! Consumes assignment, key-sharing and deactivation events and synthesizes
//! the denylist updates they imply. One sequential consumer per stream: the
//! uplink-order guarantee is per facility, and total order trivially
//! provides it.
//!
//! Write discipline: the store is the source of truth for revocation
//! intent. Store writes happen first, a failed write suppresses the unicast
//! for the affected devices, and a failed unicast is logged but never rolls
//! the store back; the next event reconciles.

use itertools::Itertools;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::denylist::{command, optimizer};
use crate::denylist_adapter::NewDenylistEntry;
use crate::prelude::*;
use crate::types::DenylistSource;

/// Bound on every outbound gateway call
const UNICAST_TIMEOUT: Duration = Duration::from_secs(5);

const SYSTEM_ACTOR: &str = "system";
const FMS_ACTOR: &str = "fms-sync";

/// Who triggered a unit unassignment; decides the entry source and author
#[derive(Clone, Debug)]
pub enum UnassignmentOrigin {
	Operator(Box<str>),
	FmsSync,
}

impl UnassignmentOrigin {
	fn source(&self) -> DenylistSource {
		match self {
			UnassignmentOrigin::Operator(_) => DenylistSource::UnitUnassignment,
			UnassignmentOrigin::FmsSync => DenylistSource::FmsSync,
		}
	}

	fn created_by(&self) -> &str {
		match self {
			UnassignmentOrigin::Operator(actor) => actor,
			UnassignmentOrigin::FmsSync => FMS_ACTOR,
		}
	}
}

/// A change event observed from the assignment / sharing / user lifecycle
#[derive(Clone, Debug)]
pub enum CascadeEvent {
	TenantAssigned {
		tenant_id: Box<str>,
		unit_id: Box<str>,
		facility_id: Box<str>,
	},
	TenantUnassigned {
		tenant_id: Box<str>,
		unit_id: Box<str>,
		facility_id: Box<str>,
		origin: Option<UnassignmentOrigin>,
	},
	KeySharingRevoked {
		unit_id: Box<str>,
		primary_tenant_id: Box<str>,
		shared_with_user_id: Box<str>,
		facility_id: Box<str>,
	},
	UserDeactivated {
		user_id: Box<str>,
		actor: Option<Box<str>>,
	},
}

pub type CascadeSender = flume::Sender<CascadeEvent>;

/// The consuming end of the cascade stream
pub struct CascadeListener {
	rx: flume::Receiver<CascadeEvent>,
}

pub fn channel() -> (CascadeSender, CascadeListener) {
	let (tx, rx) = flume::unbounded();
	(tx, CascadeListener { rx })
}

impl CascadeListener {
	/// Runs until every sender is dropped and the queue is drained
	pub async fn run(self, app: App) {
		info!("cascade listener started");
		while let Ok(event) = self.rx.recv_async().await {
			if let Err(err) = handle_event(&app, &event).await {
				error!("cascade event failed: {} ({:?})", err, event);
			}
		}
		info!("cascade listener drained");
	}
}

async fn handle_event(app: &App, event: &CascadeEvent) -> ClResult<()> {
	match event {
		CascadeEvent::TenantUnassigned { tenant_id, unit_id, facility_id, origin } => {
			let (source, created_by) = match origin {
				Some(origin) => (origin.source(), origin.created_by()),
				None => (DenylistSource::UnitUnassignment, SYSTEM_ACTOR),
			};
			deny_on_units(app, std::slice::from_ref(unit_id), tenant_id, facility_id, source, created_by)
				.await
		}
		CascadeEvent::TenantAssigned { tenant_id, unit_id, .. } => {
			clear_on_units(app, std::slice::from_ref(unit_id), tenant_id).await
		}
		CascadeEvent::KeySharingRevoked {
			unit_id,
			primary_tenant_id,
			shared_with_user_id,
			facility_id,
		} => {
			deny_on_units(
				app,
				std::slice::from_ref(unit_id),
				shared_with_user_id,
				facility_id,
				DenylistSource::KeySharingRevocation,
				primary_tenant_id,
			)
			.await
		}
		CascadeEvent::UserDeactivated { user_id, actor } => {
			deactivate_user(app, user_id, actor.as_deref().unwrap_or(SYSTEM_ACTOR)).await
		}
	}
}

/// Denylists `user_id` on every lock of `unit_ids` and unicasts one
/// `DENYLIST_ADD` to `facility_id` unless the optimizer elides it.
async fn deny_on_units(
	app: &App,
	unit_ids: &[Box<str>],
	user_id: &str,
	facility_id: &str,
	source: DenylistSource,
	created_by: &str,
) -> ClResult<()> {
	let locks = app.directory_adapter.list_locks_for_units(unit_ids).await?;
	if locks.is_empty() {
		debug!("no locks on units {:?}, nothing to deny", unit_ids);
		return Ok(());
	}

	let now = Timestamp::now();
	let expires_at = now.add_seconds(app.config.route_pass_ttl_seconds());

	let mut written: Vec<Box<str>> = Vec::new();
	for lock in &locks {
		let entry = NewDenylistEntry {
			device_id: &lock.lock_id,
			user_id,
			expires_at,
			source,
			created_by,
		};
		match app.denylist_adapter.create_entry(&entry).await {
			Ok(()) => written.push(lock.lock_id.clone()),
			// a device whose row did not commit must not receive a command
			Err(err) => error!("denylist write failed for device {}: {}", lock.lock_id, err),
		}
	}
	if written.is_empty() {
		return Ok(());
	}

	if skip_add(app, user_id, now).await {
		debug!("no live route pass for {}, denylist add recorded without unicast", user_id);
		return Ok(());
	}

	let entries = [command::DenylistEntryClaim { sub: user_id.into(), exp: expires_at.0 }];
	let token = command::build_add(&app.signer, &written, &entries)?;
	unicast(app, facility_id, &token).await;
	Ok(())
}

/// Clears the user's entries on the unit's locks and unicasts a
/// `DENYLIST_REMOVE` per facility that still holds a non-expired entry.
async fn clear_on_units(app: &App, unit_ids: &[Box<str>], tenant_id: &str) -> ClResult<()> {
	let entries = app.denylist_adapter.find_by_units_and_user(unit_ids, tenant_id).await?;
	if entries.is_empty() {
		return Ok(());
	}

	let now = Timestamp::now();
	let mut removed_by_facility: BTreeMap<Box<str>, Vec<crate::denylist_adapter::FacilityDenylistEntry>> =
		BTreeMap::new();
	for fe in entries {
		match app.denylist_adapter.remove_entry(&fe.entry.device_id, &fe.entry.user_id).await {
			Ok(()) => removed_by_facility.entry(fe.facility_id.clone()).or_default().push(fe),
			// an entry still in the store must not be removed lock-side
			Err(err) => {
				error!("denylist remove failed for device {}: {}", fe.entry.device_id, err);
			}
		}
	}

	for (facility_id, group) in &removed_by_facility {
		let any_live =
			group.iter().any(|fe| !optimizer::should_skip_denylist_remove(&fe.entry, now));
		if !any_live {
			debug!(
				"entries for {} in facility {} already expired, store cleaned without unicast",
				tenant_id, facility_id
			);
			continue;
		}
		let targets: Vec<Box<str>> =
			group.iter().map(|fe| fe.entry.device_id.clone()).unique().collect();
		let subjects = [Box::<str>::from(tenant_id)];
		let token = command::build_remove(&app.signer, &targets, &subjects)?;
		unicast(app, facility_id, &token).await;
	}
	Ok(())
}

/// Denylists a deactivated user on the union of their assigned and shared
/// units, one `DENYLIST_ADD` per affected facility.
async fn deactivate_user(app: &App, user_id: &str, actor: &str) -> ClResult<()> {
	let now = Timestamp::now();
	let assigned = app.directory_adapter.list_assigned_unit_ids(user_id).await?;
	let shared = app.directory_adapter.list_shared_unit_ids(user_id, now).await?;
	let units: Vec<Box<str>> = assigned.into_iter().chain(shared).unique().collect();
	if units.is_empty() {
		debug!("deactivated user {} has no unit access, nothing to deny", user_id);
		return Ok(());
	}

	let locks = app.directory_adapter.list_locks_for_units(&units).await?;
	let expires_at = now.add_seconds(app.config.route_pass_ttl_seconds());

	let mut written_by_facility: BTreeMap<Box<str>, Vec<Box<str>>> = BTreeMap::new();
	for lock in &locks {
		let entry = NewDenylistEntry {
			device_id: &lock.lock_id,
			user_id,
			expires_at,
			source: DenylistSource::UserDeactivation,
			created_by: actor,
		};
		match app.denylist_adapter.create_entry(&entry).await {
			Ok(()) => written_by_facility
				.entry(lock.facility_id.clone())
				.or_default()
				.push(lock.lock_id.clone()),
			Err(err) => error!("denylist write failed for device {}: {}", lock.lock_id, err),
		}
	}
	if written_by_facility.is_empty() {
		return Ok(());
	}

	if skip_add(app, user_id, now).await {
		debug!("no live route pass for {}, deactivation recorded without unicast", user_id);
		return Ok(());
	}

	let entries = [command::DenylistEntryClaim { sub: user_id.into(), exp: expires_at.0 }];
	for (facility_id, targets) in &written_by_facility {
		let token = command::build_add(&app.signer, targets, &entries)?;
		unicast(app, facility_id, &token).await;
	}
	Ok(())
}

/// Optimizer consult; a failed read falls back to sending (superfluous
/// commands are benign, missing ones are not)
async fn skip_add(app: &App, user_id: &str, now: Timestamp) -> bool {
	match optimizer::should_skip_denylist_add(app.denylist_adapter.as_ref(), user_id, now).await {
		Ok(skip) => skip,
		Err(err) => {
			warn!("optimizer read failed for {}: {}", user_id, err);
			false
		}
	}
}

async fn unicast(app: &App, facility_id: &str, token: &str) {
	let send = app.gateway_adapter.unicast_to_facility(facility_id, token);
	match tokio::time::timeout(UNICAST_TIMEOUT, send).await {
		Ok(Ok(())) => {}
		Ok(Err(err)) => warn!("unicast to facility {} failed: {}", facility_id, err),
		Err(_) => warn!("unicast to facility {} timed out", facility_id),
	}
}

// vim: ts=4
