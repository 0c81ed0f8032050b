//! SQLite-backed access adapter for BluLok.
//!
//! Implements [`DirectoryAdapter`] and [`DenylistAdapter`] over a single
//! SQLite database. One adapter instance owns one connection pool; the
//! schema is created on first open.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;

use blulok::denylist_adapter::{
	DenylistAdapter, DenylistEntry, FacilityDenylistEntry, NewDenylistEntry, RoutePassIssuance,
};
use blulok::directory_adapter::{
	DirectoryAdapter, LockPlacement, LockRef, NewKeySharing, NewSchedule, NewUserDevice,
	ScheduleWindows, SharedLock, UserDevice, UserRecord,
};
use blulok::prelude::*;
use blulok::types::DeviceStatus;

mod denylist;
mod device;
mod directory;
mod issuance;
mod schedule;
mod schema;
mod sharing;
mod utils;

#[derive(Debug)]
pub struct AccessAdapterSqlite {
	db: SqlitePool,
}

impl AccessAdapterSqlite {
	/// Opens (creating if missing) the database at `db_path` and ensures
	/// the schema is present
	pub async fn new(db_path: impl AsRef<Path>) -> ClResult<Self> {
		let options = SqliteConnectOptions::new()
			.filename(db_path.as_ref())
			.create_if_missing(true)
			.foreign_keys(true);
		let db = SqlitePool::connect_with(options).await.map_err(|err| {
			error!("cannot open access db: {}", err);
			Error::DbError
		})?;
		schema::init_db(&db).await.map_err(|err| {
			error!("cannot initialize access db schema: {}", err);
			Error::DbError
		})?;

		Ok(Self { db })
	}
}

#[async_trait]
impl DirectoryAdapter for AccessAdapterSqlite {
	async fn read_user(&self, user_id: &str) -> ClResult<UserRecord> {
		directory::read_user(&self.db, user_id).await
	}

	async fn create_user(&self, user: &UserRecord) -> ClResult<()> {
		directory::create_user(&self.db, user).await
	}

	async fn update_user_active(&self, user_id: &str, active: bool) -> ClResult<()> {
		directory::update_user_active(&self.db, user_id, active).await
	}

	async fn read_device(&self, user_id: &str, app_device_id: &str) -> ClResult<UserDevice> {
		device::read(&self.db, user_id, app_device_id).await
	}

	async fn read_latest_device(&self, user_id: &str) -> ClResult<UserDevice> {
		device::read_latest(&self.db, user_id).await
	}

	async fn create_device(&self, device: &NewUserDevice<'_>) -> ClResult<()> {
		device::create(&self.db, device).await
	}

	async fn attest_device_key(
		&self,
		user_id: &str,
		app_device_id: &str,
		public_key: &str,
	) -> ClResult<()> {
		device::attest_key(&self.db, user_id, app_device_id, public_key).await
	}

	async fn update_device_status(&self, device_id: &str, status: DeviceStatus) -> ClResult<()> {
		device::update_status(&self.db, device_id, status).await
	}

	async fn create_facility(&self, facility_id: &str) -> ClResult<()> {
		directory::create_facility(&self.db, facility_id).await
	}

	async fn create_unit(&self, unit_id: &str, facility_id: &str) -> ClResult<()> {
		directory::create_unit(&self.db, unit_id, facility_id).await
	}

	async fn create_lock(&self, lock_id: &str, unit_id: &str) -> ClResult<()> {
		directory::create_lock(&self.db, lock_id, unit_id).await
	}

	async fn list_all_lock_ids(&self) -> ClResult<Vec<Box<str>>> {
		directory::list_all_lock_ids(&self.db).await
	}

	async fn list_lock_ids_by_facilities(
		&self,
		facility_ids: &[Box<str>],
	) -> ClResult<Vec<Box<str>>> {
		directory::list_lock_ids_by_facilities(&self.db, facility_ids).await
	}

	async fn read_lock_facility(&self, lock_id: &str) -> ClResult<LockPlacement> {
		directory::read_lock_facility(&self.db, lock_id).await
	}

	async fn list_locks_for_units(&self, unit_ids: &[Box<str>]) -> ClResult<Vec<LockRef>> {
		directory::list_locks_for_units(&self.db, unit_ids).await
	}

	async fn upsert_assignment(
		&self,
		unit_id: &str,
		tenant_id: &str,
		primary: bool,
	) -> ClResult<()> {
		directory::upsert_assignment(&self.db, unit_id, tenant_id, primary).await
	}

	async fn remove_assignment(&self, unit_id: &str, tenant_id: &str) -> ClResult<()> {
		directory::remove_assignment(&self.db, unit_id, tenant_id).await
	}

	async fn list_assigned_lock_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		directory::list_assigned_lock_ids(&self.db, user_id).await
	}

	async fn list_assigned_unit_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		directory::list_assigned_unit_ids(&self.db, user_id).await
	}

	async fn create_key_sharing(&self, sharing: &NewKeySharing<'_>) -> ClResult<()> {
		sharing::create(&self.db, sharing).await
	}

	async fn revoke_key_sharing(&self, sharing_id: &str) -> ClResult<()> {
		sharing::revoke(&self.db, sharing_id).await
	}

	async fn list_shared_locks(&self, user_id: &str, now: Timestamp) -> ClResult<Vec<SharedLock>> {
		sharing::list_shared_locks(&self.db, user_id, now).await
	}

	async fn list_shared_unit_ids(
		&self,
		user_id: &str,
		now: Timestamp,
	) -> ClResult<Vec<Box<str>>> {
		sharing::list_shared_unit_ids(&self.db, user_id, now).await
	}

	async fn create_schedule(&self, schedule: &NewSchedule<'_>) -> ClResult<()> {
		schedule::create(&self.db, schedule).await
	}

	async fn bind_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
		schedule_id: &str,
	) -> ClResult<()> {
		schedule::bind_user_facility(&self.db, user_id, facility_id, schedule_id).await
	}

	async fn list_user_facility_ids(&self, user_id: &str) -> ClResult<Vec<Box<str>>> {
		directory::list_user_facility_ids(&self.db, user_id).await
	}

	async fn read_user_facility_schedule(
		&self,
		user_id: &str,
		facility_id: &str,
	) -> ClResult<Option<ScheduleWindows>> {
		schedule::read_user_facility(&self.db, user_id, facility_id).await
	}
}

#[async_trait]
impl DenylistAdapter for AccessAdapterSqlite {
	async fn create_entry(&self, entry: &NewDenylistEntry<'_>) -> ClResult<()> {
		denylist::create(&self.db, entry).await
	}

	async fn find_by_device(&self, device_id: &str) -> ClResult<Vec<DenylistEntry>> {
		denylist::find_by_device(&self.db, device_id).await
	}

	async fn find_by_user(&self, user_id: &str) -> ClResult<Vec<DenylistEntry>> {
		denylist::find_by_user(&self.db, user_id).await
	}

	async fn find_by_units_and_user(
		&self,
		unit_ids: &[Box<str>],
		user_id: &str,
	) -> ClResult<Vec<FacilityDenylistEntry>> {
		denylist::find_by_units_and_user(&self.db, unit_ids, user_id).await
	}

	async fn remove_entry(&self, device_id: &str, user_id: &str) -> ClResult<()> {
		denylist::remove(&self.db, device_id, user_id).await
	}

	async fn delete_expired(&self, now: Timestamp) -> ClResult<u32> {
		denylist::delete_expired(&self.db, now).await
	}

	async fn create_issuance(&self, issuance: &RoutePassIssuance) -> ClResult<()> {
		issuance::create(&self.db, issuance).await
	}

	async fn count_live_issuances(&self, user_id: &str, now: Timestamp) -> ClResult<u32> {
		issuance::count_live(&self.db, user_id, now).await
	}
}

// vim: ts=4
