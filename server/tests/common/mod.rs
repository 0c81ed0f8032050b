//! In-memory adapter fakes and helpers shared by the end-to-end tests.
#![allow(dead_code)] // each test binary uses its own subset of the helpers

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use blulok::denylist_adapter::{
	DenylistAdapter, DenylistEntry, FacilityDenylistEntry, NewDenylistEntry, RoutePassIssuance,
};
use blulok::directory_adapter::{
	DirectoryAdapter, LockPlacement, LockRef, NewKeySharing, NewSchedule, NewUserDevice,
	ScheduleWindows, SharedLock, UserDevice, UserRecord,
};
use blulok::error::{ClResult, Error};
use blulok::gateway_adapter::GatewayAdapter;
use blulok::types::{DeviceStatus, TimeWindow, Timestamp};
use blulok::{App, AppBuilder};

pub const OPERATOR_SEED: [u8; 32] = [11; 32];
pub const DEVICE_SEED: [u8; 32] = [42; 32];

pub fn keypair_b64(seed: [u8; 32]) -> (String, String) {
	let signing = SigningKey::from_bytes(&seed);
	let private = URL_SAFE_NO_PAD.encode(seed);
	let public = URL_SAFE_NO_PAD.encode(signing.verifying_key().to_bytes());
	(private, public)
}

pub fn public_key_b64(seed: [u8; 32]) -> String {
	keypair_b64(seed).1
}

/// Builds a device-signed compact token the way the mobile app does
pub fn device_signed_token(
	seed: [u8; 32],
	sub: &str,
	dev: &str,
	iat: i64,
	iss: &str,
	aud: &str,
) -> String {
	#[derive(Serialize)]
	struct Claims<'a> {
		sub: &'a str,
		dev: &'a str,
		iat: i64,
		iss: &'a str,
		aud: &'a str,
	}

	let signing = SigningKey::from_bytes(&seed);
	let pkcs8 = signing.to_pkcs8_der().unwrap();
	let key = EncodingKey::from_ed_der(pkcs8.as_bytes());
	jsonwebtoken::encode(
		&Header::new(Algorithm::EdDSA),
		&Claims { sub, dev, iat, iss, aud },
		&key,
	)
	.unwrap()
}

// MemoryDirectory
//*****************

#[derive(Clone, Debug)]
struct ShareRow {
	id: Box<str>,
	unit_id: Box<str>,
	primary_tenant_id: Box<str>,
	shared_with_user_id: Box<str>,
	active: bool,
	expires_at: Option<Timestamp>,
}

#[derive(Debug, Default)]
struct DirectoryState {
	users: HashMap<Box<str>, UserRecord>,
	devices: Vec<UserDevice>,
	units: HashMap<Box<str>, Box<str>>,
	locks: HashMap<Box<str>, Box<str>>,
	assignments: Vec<(Box<str>, Box<str>)>,
	shares: Vec<ShareRow>,
	schedules: HashMap<Box<str>, Vec<TimeWindow>>,
	bindings: HashMap<(Box<str>, Box<str>), Box<str>>,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
	state: Mutex<DirectoryState>,
}

impl MemoryDirectory {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	fn usable(device: &UserDevice) -> bool {
		device.status.usable_for_issuance()
	}

	/// `(unit_id, facility_id)` of a lock, for the denylist fake's join
	pub fn lock_placement(&self, lock_id: &str) -> Option<(Box<str>, Box<str>)> {
		let state = self.state.lock().unwrap();
		let unit_id = state.locks.get(lock_id)?;
		let facility_id = state.units.get(unit_id)?;
		Some((unit_id.clone(), facility_id.clone()))
	}
}

#[async_trait]
impl DirectoryAdapter for MemoryDirectory {
	async fn read_user(&self, user_id: &str) -> ClResult<UserRecord> {
		let state = self.state.lock().unwrap();
		state.users.get(user_id).cloned().ok_or(Error::NotFound)
	}

	async fn create_user(&self, user: &UserRecord) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.users.insert(user.id.clone(), user.clone());
		Ok(())
	}

	async fn update_user_active(&self, user_id: &str, active: bool) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		let user = state.users.get_mut(user_id).ok_or(Error::NotFound)?;
		user.active = active;
		Ok(())
	}

	async fn read_device(&self, user_id: &str, app_device_id: &str) -> ClResult<UserDevice> {
		let state = self.state.lock().unwrap();
		state
			.devices
			.iter()
			.filter(|d| {
				d.user_id.as_ref() == user_id
					&& d.app_device_id.as_ref() == app_device_id
					&& Self::usable(d)
			})
			.max_by_key(|d| d.updated_at)
			.cloned()
			.ok_or(Error::NotFound)
	}

	async fn read_latest_device(&self, user_id: &str) -> ClResult<UserDevice> {
		let state = self.state.lock().unwrap();
		state
			.devices
			.iter()
			.filter(|d| d.user_id.as_ref() == user_id && Self::usable(d))
			.max_by_key(|d| d.updated_at)
			.cloned()
			.ok_or(Error::NotFound)
	}

	async fn create_device(&self, device: &NewUserDevice<'_>) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.devices.push(UserDevice {
			id: device.id.into(),
			user_id: device.user_id.into(),
			app_device_id: device.app_device_id.into(),
			status: DeviceStatus::PendingKey,
			public_key: None,
			updated_at: Timestamp::now(),
		});
		Ok(())
	}

	async fn attest_device_key(
		&self,
		user_id: &str,
		app_device_id: &str,
		public_key: &str,
	) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		let device = state
			.devices
			.iter_mut()
			.find(|d| {
				d.user_id.as_ref() == user_id
					&& d.app_device_id.as_ref() == app_device_id
					&& d.status.usable_for_issuance()
			})
			.ok_or(Error::NotFound)?;
		device.public_key = Some(public_key.into());
		device.status = DeviceStatus::Active;
		Ok(())
	}

	async fn update_device_status(&self, device_id: &str, status: DeviceStatus) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		let device = state
			.devices
			.iter_mut()
			.find(|d| d.id.as_ref() == device_id)
			.ok_or(Error::NotFound)?;
		if !device.status.may_become(status) {
			return Err(Error::Conflict("invalid device status transition".into()));
		}
		device.status = status;
		Ok(())
	}

	async fn create_facility(&self, _facility_id: &str) -> ClResult<()> {
		Ok(())
	}

	async fn create_unit(&self, unit_id: &str, facility_id: &str) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.units.insert(unit_id.into(), facility_id.into());
		Ok(())
	}

	async fn create_lock(&self, lock_id: &str, unit_id: &str) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.locks.insert(lock_id.into(), unit_id.into());
		Ok(())
	}

	async fn list_all_lock_ids(&self) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state.locks.keys().cloned().collect();
		ids.sort();
		Ok(ids)
	}

	async fn list_lock_ids_by_facilities(
		&self,
		facility_ids: &[Box<str>],
	) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state
			.locks
			.iter()
			.filter(|(_, unit)| state.units.get(*unit).is_some_and(|f| facility_ids.contains(f)))
			.map(|(lock, _)| lock.clone())
			.collect();
		ids.sort();
		Ok(ids)
	}

	async fn read_lock_facility(&self, lock_id: &str) -> ClResult<LockPlacement> {
		let state = self.state.lock().unwrap();
		let unit_id = state.locks.get(lock_id).ok_or(Error::NotFound)?;
		let facility_id = state.units.get(unit_id).ok_or(Error::NotFound)?;
		Ok(LockPlacement { unit_id: unit_id.clone(), facility_id: facility_id.clone() })
	}

	async fn list_locks_for_units(&self, unit_ids: &[Box<str>]) -> ClResult<Vec<LockRef>> {
		let state = self.state.lock().unwrap();
		let mut refs: Vec<LockRef> = state
			.locks
			.iter()
			.filter(|(_, unit)| unit_ids.contains(*unit))
			.map(|(lock, unit)| LockRef {
				lock_id: lock.clone(),
				unit_id: unit.clone(),
				facility_id: state.units.get(unit).cloned().unwrap_or_default(),
			})
			.collect();
		refs.sort_by(|a, b| a.lock_id.cmp(&b.lock_id));
		Ok(refs)
	}

	async fn upsert_assignment(
		&self,
		unit_id: &str,
		tenant_id: &str,
		_primary: bool,
	) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		let pair = (Box::<str>::from(unit_id), Box::<str>::from(tenant_id));
		if !state.assignments.contains(&pair) {
			state.assignments.push(pair);
		}
		Ok(())
	}

	async fn remove_assignment(&self, unit_id: &str, tenant_id: &str) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state
			.assignments
			.retain(|(u, t)| !(u.as_ref() == unit_id && t.as_ref() == tenant_id));
		Ok(())
	}

	async fn list_assigned_lock_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state
			.locks
			.iter()
			.filter(|(_, unit)| {
				state.assignments.iter().any(|(u, t)| u == *unit && t.as_ref() == user_id)
			})
			.map(|(lock, _)| lock.clone())
			.collect();
		ids.sort();
		Ok(ids)
	}

	async fn list_assigned_unit_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state
			.assignments
			.iter()
			.filter(|(_, t)| t.as_ref() == user_id)
			.map(|(u, _)| u.clone())
			.collect();
		ids.sort();
		Ok(ids)
	}

	async fn create_key_sharing(&self, sharing: &NewKeySharing<'_>) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.shares.push(ShareRow {
			id: sharing.id.into(),
			unit_id: sharing.unit_id.into(),
			primary_tenant_id: sharing.primary_tenant_id.into(),
			shared_with_user_id: sharing.shared_with_user_id.into(),
			active: true,
			expires_at: sharing.expires_at,
		});
		Ok(())
	}

	async fn revoke_key_sharing(&self, sharing_id: &str) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		let share = state
			.shares
			.iter_mut()
			.find(|s| s.id.as_ref() == sharing_id)
			.ok_or(Error::NotFound)?;
		share.active = false;
		Ok(())
	}

	async fn list_shared_locks(&self, user_id: &str, now: Timestamp) -> ClResult<Vec<SharedLock>> {
		let state = self.state.lock().unwrap();
		let mut locks: Vec<SharedLock> = state
			.shares
			.iter()
			.filter(|s| {
				s.shared_with_user_id.as_ref() == user_id
					&& s.active && s.expires_at.is_none_or(|exp| exp > now)
			})
			.flat_map(|share| {
				state
					.locks
					.iter()
					.filter(|(_, unit)| **unit == share.unit_id)
					.map(|(lock, unit)| SharedLock {
						primary_tenant_id: share.primary_tenant_id.clone(),
						lock_id: lock.clone(),
						unit_id: unit.clone(),
						facility_id: state.units.get(unit).cloned().unwrap_or_default(),
					})
					.collect::<Vec<_>>()
			})
			.collect();
		locks.sort_by(|a, b| a.lock_id.cmp(&b.lock_id));
		Ok(locks)
	}

	async fn list_shared_unit_ids(
		&self,
		user_id: &str,
		now: Timestamp,
	) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state
			.shares
			.iter()
			.filter(|s| {
				s.shared_with_user_id.as_ref() == user_id
					&& s.active && s.expires_at.is_none_or(|exp| exp > now)
			})
			.map(|s| s.unit_id.clone())
			.collect();
		ids.sort();
		ids.dedup();
		Ok(ids)
	}

	async fn create_schedule(&self, schedule: &NewSchedule<'_>) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.schedules.insert(schedule.id.into(), schedule.windows.to_vec());
		Ok(())
	}

	async fn bind_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
		schedule_id: &str,
	) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state.bindings.insert((user_id.into(), facility_id.into()), schedule_id.into());
		Ok(())
	}

	async fn list_user_facility_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		let state = self.state.lock().unwrap();
		let mut ids: Vec<Box<str>> = state
			.assignments
			.iter()
			.filter(|(_, t)| t.as_ref() == user_id)
			.filter_map(|(u, _)| state.units.get(u).cloned())
			.chain(
				state
					.bindings
					.keys()
					.filter(|(u, _)| u.as_ref() == user_id)
					.map(|(_, f)| f.clone()),
			)
			.collect();
		ids.sort();
		ids.dedup();
		Ok(ids)
	}

	async fn read_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
	) -> ClResult<Option<ScheduleWindows>> {
		let state = self.state.lock().unwrap();
		let key = (Box::<str>::from(user_id), Box::<str>::from(facility_id));
		let Some(schedule_id) = state.bindings.get(&key) else {
			return Ok(None);
		};
		let windows = state.schedules.get(schedule_id).cloned().unwrap_or_default();
		Ok(Some(ScheduleWindows { facility_id: facility_id.into(), windows }))
	}
}

// MemoryDenylist
//****************

#[derive(Debug, Default)]
struct DenylistState {
	entries: Vec<DenylistEntry>,
	issuances: Vec<RoutePassIssuance>,
	next_id: i64,
}

#[derive(Debug)]
pub struct MemoryDenylist {
	state: Mutex<DenylistState>,
	directory: Arc<MemoryDirectory>,
	pub fail_entry_writes: AtomicBool,
	pub fail_issuance_writes: AtomicBool,
}

impl MemoryDenylist {
	pub fn new(directory: Arc<MemoryDirectory>) -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(DenylistState::default()),
			directory,
			fail_entry_writes: AtomicBool::new(false),
			fail_issuance_writes: AtomicBool::new(false),
		})
	}

	pub fn entries(&self) -> Vec<DenylistEntry> {
		self.state.lock().unwrap().entries.clone()
	}

	pub fn issuances(&self) -> Vec<RoutePassIssuance> {
		self.state.lock().unwrap().issuances.clone()
	}
}

#[async_trait]
impl DenylistAdapter for MemoryDenylist {
	async fn create_entry(&self, entry: &NewDenylistEntry<'_>) -> ClResult<()> {
		if self.fail_entry_writes.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		let mut state = self.state.lock().unwrap();
		if let Some(existing) = state.entries.iter_mut().find(|e| {
			e.device_id.as_ref() == entry.device_id && e.user_id.as_ref() == entry.user_id
		}) {
			existing.expires_at = existing.expires_at.max(entry.expires_at);
			existing.source = entry.source;
			existing.created_by = entry.created_by.into();
			return Ok(());
		}
		state.next_id += 1;
		let id = state.next_id;
		state.entries.push(DenylistEntry {
			id,
			device_id: entry.device_id.into(),
			user_id: entry.user_id.into(),
			expires_at: entry.expires_at,
			source: entry.source,
			created_by: entry.created_by.into(),
			created_at: Timestamp::now(),
		});
		Ok(())
	}

	async fn find_by_device(&self, device_id: &str) -> ClResult<Vec<DenylistEntry>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.entries
			.iter()
			.filter(|e| e.device_id.as_ref() == device_id)
			.cloned()
			.collect())
	}

	async fn find_by_user(&self, user_id: &str) -> ClResult<Vec<DenylistEntry>> {
		let state = self.state.lock().unwrap();
		Ok(state.entries.iter().filter(|e| e.user_id.as_ref() == user_id).cloned().collect())
	}

	async fn find_by_units_and_user(
		&self,
		unit_ids: &[Box<str>],
		user_id: &str,
	) -> ClResult<Vec<FacilityDenylistEntry>> {
		let state = self.state.lock().unwrap();
		let mut found = Vec::new();
		for entry in state.entries.iter().filter(|e| e.user_id.as_ref() == user_id) {
			if let Some((unit_id, facility_id)) =
				self.directory.lock_placement(&entry.device_id)
			{
				if unit_ids.contains(&unit_id) {
					found.push(FacilityDenylistEntry { entry: entry.clone(), facility_id });
				}
			}
		}
		Ok(found)
	}

	async fn remove_entry(&self, device_id: &str, user_id: &str) -> ClResult<()> {
		let mut state = self.state.lock().unwrap();
		state
			.entries
			.retain(|e| !(e.device_id.as_ref() == device_id && e.user_id.as_ref() == user_id));
		Ok(())
	}

	async fn delete_expired(&self, now: Timestamp) -> ClResult<u32> {
		let mut state = self.state.lock().unwrap();
		let before = state.entries.len();
		state.entries.retain(|e| e.expires_at > now);
		Ok((before - state.entries.len()) as u32)
	}

	async fn create_issuance(&self, issuance: &RoutePassIssuance) -> ClResult<()> {
		if self.fail_issuance_writes.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		let mut state = self.state.lock().unwrap();
		state.issuances.push(issuance.clone());
		Ok(())
	}

	async fn count_live_issuances(&self, user_id: &str, now: Timestamp) -> ClResult<u32> {
		let state = self.state.lock().unwrap();
		Ok(state
			.issuances
			.iter()
			.filter(|i| i.user_id.as_ref() == user_id && i.expires_at > now)
			.count() as u32)
	}
}

// RecordingGateway
//******************

#[derive(Debug, Default)]
pub struct RecordingGateway {
	sent: Mutex<Vec<(Box<str>, Box<str>)>>,
	pub fail_sends: AtomicBool,
}

impl RecordingGateway {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// `(facility_id, signed_command)` pairs in send order
	pub fn sent(&self) -> Vec<(Box<str>, Box<str>)> {
		self.sent.lock().unwrap().clone()
	}
}

#[async_trait]
impl GatewayAdapter for RecordingGateway {
	async fn unicast_to_facility(&self, facility_id: &str, command: &str) -> ClResult<()> {
		if self.fail_sends.load(Ordering::SeqCst) {
			return Err(Error::DeliveryFailed("gateway link down".into()));
		}
		self.sent.lock().unwrap().push((facility_id.into(), command.into()));
		Ok(())
	}
}

// App wiring
//************

pub struct TestEnv {
	pub app: App,
	pub directory: Arc<MemoryDirectory>,
	pub denylist: Arc<MemoryDenylist>,
	pub gateway: Arc<RecordingGateway>,
}

pub fn build_env(configure: impl FnOnce(&mut AppBuilder)) -> TestEnv {
	let directory = MemoryDirectory::new();
	let denylist = MemoryDenylist::new(directory.clone());
	let gateway = RecordingGateway::new();

	let (private, public) = keypair_b64(OPERATOR_SEED);
	let mut builder = AppBuilder::new();
	builder
		.operator_keys(private, public)
		.directory_adapter(directory.clone())
		.denylist_adapter(denylist.clone())
		.gateway_adapter(gateway.clone());
	configure(&mut builder);
	let app = builder.build().unwrap();

	TestEnv { app, directory, denylist, gateway }
}
