//! Adapter for the access directory: users, devices, facilities, units,
//! locks, assignments, key shares and schedules.
//!
//! The access core only reads this data at issuance time; the write
//! operations exist for the external CRUD surface and for bootstrap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::{DeviceStatus, Role, ScheduleKind, TimeWindow};

/// A platform user as the access core sees it
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserRecord {
	pub id: Box<str>,
	pub role: Role,
	pub active: bool,
}

/// A registered mobile device
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserDevice {
	pub id: Box<str>,
	pub user_id: Box<str>,
	pub app_device_id: Box<str>,
	pub status: DeviceStatus,
	/// base64url-encoded 32-byte Ed25519 public key, absent until attested
	pub public_key: Option<Box<str>>,
	pub updated_at: Timestamp,
}

/// Data needed to register a new device (starts in `pending_key`)
#[derive(Debug)]
pub struct NewUserDevice<'a> {
	pub id: &'a str,
	pub user_id: &'a str,
	pub app_device_id: &'a str,
}

/// A lock reachable through a live key share
#[derive(Clone, Debug)]
pub struct SharedLock {
	pub primary_tenant_id: Box<str>,
	pub lock_id: Box<str>,
	pub unit_id: Box<str>,
	pub facility_id: Box<str>,
}

/// Where a lock sits in the facility hierarchy
#[derive(Clone, Debug)]
pub struct LockPlacement {
	pub unit_id: Box<str>,
	pub facility_id: Box<str>,
}

/// A lock with its unit and facility, for cascade fan-out
#[derive(Clone, Debug)]
pub struct LockRef {
	pub lock_id: Box<str>,
	pub unit_id: Box<str>,
	pub facility_id: Box<str>,
}

/// The raw time windows of a user's schedule binding in one facility
#[derive(Clone, Debug)]
pub struct ScheduleWindows {
	pub facility_id: Box<str>,
	pub windows: Vec<TimeWindow>,
}

/// Data needed to create a schedule with its time windows
#[derive(Debug)]
pub struct NewSchedule<'a> {
	pub id: &'a str,
	pub facility_id: &'a str,
	pub name: &'a str,
	pub kind: ScheduleKind,
	pub windows: &'a [TimeWindow],
}

/// Data needed to create a key share
#[derive(Debug)]
pub struct NewKeySharing<'a> {
	pub id: &'a str,
	pub unit_id: &'a str,
	pub primary_tenant_id: &'a str,
	pub shared_with_user_id: &'a str,
	pub expires_at: Option<Timestamp>,
}

/// A BluLok directory adapter
///
/// Every `DirectoryAdapter` implementation is required to implement this
/// trait. It owns the relations the access core consults when deciding who
/// may open which locks.
#[async_trait]
pub trait DirectoryAdapter: Debug + Send + Sync {
	// Users
	async fn read_user(&self, user_id: &str) -> ClResult<UserRecord>;
	async fn create_user(&self, user: &UserRecord) -> ClResult<()>;
	async fn update_user_active(&self, user_id: &str, active: bool) -> ClResult<()>;

	// Devices
	/// Reads the usable (active or pending-key) device for `(user, app_device_id)`
	async fn read_device(&self, user_id: &str, app_device_id: &str) -> ClResult<UserDevice>;

	/// Reads the most recently updated usable device of the user
	async fn read_latest_device(&self, user_id: &str) -> ClResult<UserDevice>;

	async fn create_device(&self, device: &NewUserDevice<'_>) -> ClResult<()>;

	/// Stores the attested public key and moves the device to `active`
	async fn attest_device_key(
		&self,
		user_id: &str,
		app_device_id: &str,
		public_key: &str,
	) -> ClResult<()>;

	/// Applies a status transition; invalid transitions are a `Conflict`
	async fn update_device_status(&self, device_id: &str, status: DeviceStatus) -> ClResult<()>;

	// Facility hierarchy
	async fn create_facility(&self, facility_id: &str) -> ClResult<()>;
	async fn create_unit(&self, unit_id: &str, facility_id: &str) -> ClResult<()>;
	async fn create_lock(&self, lock_id: &str, unit_id: &str) -> ClResult<()>;

	async fn list_all_lock_ids(&self) -> ClResult<Vec<Box<str>>>;
	async fn list_lock_ids_by_facilities(&self, facility_ids: &[Box<str>])
		-> ClResult<Vec<Box<str>>>;
	async fn read_lock_facility(&self, lock_id: &str) -> ClResult<LockPlacement>;
	async fn list_locks_for_units(&self, unit_ids: &[Box<str>]) -> ClResult<Vec<LockRef>>;

	// Assignments
	async fn upsert_assignment(&self, unit_id: &str, tenant_id: &str, primary: bool)
		-> ClResult<()>;
	async fn remove_assignment(&self, unit_id: &str, tenant_id: &str) -> ClResult<()>;

	/// Lock ids on units directly assigned to the user
	async fn list_assigned_lock_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>>;

	/// Unit ids directly assigned to the user
	async fn list_assigned_unit_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>>;

	// Key sharing
	async fn create_key_sharing(&self, sharing: &NewKeySharing<'_>) -> ClResult<()>;
	async fn revoke_key_sharing(&self, sharing_id: &str) -> ClResult<()>;

	/// Locks reachable by the user through shares that are active and not
	/// expired at `now`
	async fn list_shared_locks(&self, user_id: &str, now: Timestamp) -> ClResult<Vec<SharedLock>>;

	/// Unit ids reachable by the user through live shares
	async fn list_shared_unit_ids(&self, user_id: &str, now: Timestamp)
		-> ClResult<Vec<Box<str>>>;

	// Schedules
	async fn create_schedule(&self, schedule: &NewSchedule<'_>) -> ClResult<()>;
	async fn bind_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
		schedule_id: &str,
	) -> ClResult<()>;

	/// Facilities associated with the user, in stable (lexicographic) order
	async fn list_user_facility_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>>;

	/// The user's schedule binding in one facility, with joined windows
	async fn read_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
	) -> ClResult<Option<ScheduleWindows>>;
}

// vim: ts=4
