//! Database schema initialization
//!
//! Creates the tables and indexes of the access directory, the denylist
//! store and the route-pass issuance log.

use sqlx::SqlitePool;

/// Initialize the database schema with all required tables and indexes
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Users
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS users (
		user_id text NOT NULL,
		role text NOT NULL,
		is_active integer NOT NULL DEFAULT 1,
		created_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(user_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Devices
	//*********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS user_devices (
		device_id text NOT NULL,
		user_id text NOT NULL,
		app_device_id text NOT NULL,
		status text NOT NULL DEFAULT 'pending_key',
		public_key text,
		created_at datetime DEFAULT (unixepoch()),
		updated_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(device_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_user_devices_pair ON user_devices(user_id, app_device_id)",
	)
	.execute(&mut *tx)
	.await?;

	// Facility hierarchy
	//********************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS facilities (
		facility_id text NOT NULL,
		PRIMARY KEY(facility_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS units (
		unit_id text NOT NULL,
		facility_id text NOT NULL,
		PRIMARY KEY(unit_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_units_facility ON units(facility_id)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS locks (
		lock_id text NOT NULL,
		unit_id text NOT NULL,
		PRIMARY KEY(lock_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_locks_unit ON locks(unit_id)")
		.execute(&mut *tx)
		.await?;

	// Assignments
	//*************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS unit_assignments (
		unit_id text NOT NULL,
		tenant_id text NOT NULL,
		is_primary integer NOT NULL DEFAULT 0,
		PRIMARY KEY(unit_id, tenant_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_unit_assignments_tenant ON unit_assignments(tenant_id)",
	)
	.execute(&mut *tx)
	.await?;

	// Key sharing
	//*************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS key_sharing (
		sharing_id text NOT NULL,
		unit_id text NOT NULL,
		primary_tenant_id text NOT NULL,
		shared_with_user_id text NOT NULL,
		is_active integer NOT NULL DEFAULT 1,
		expires_at integer,
		created_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(sharing_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_key_sharing_invitee ON key_sharing(shared_with_user_id)",
	)
	.execute(&mut *tx)
	.await?;

	// Schedules
	//***********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS schedules (
		schedule_id text NOT NULL,
		facility_id text NOT NULL,
		kind text NOT NULL,
		name text NOT NULL,
		PRIMARY KEY(schedule_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS schedule_time_windows (
		schedule_id text NOT NULL,
		day_of_week integer NOT NULL,
		start_time text NOT NULL,
		end_time text NOT NULL
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_schedule_time_windows ON schedule_time_windows(schedule_id)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS user_facility_schedules (
		user_id text NOT NULL,
		facility_id text NOT NULL,
		schedule_id text NOT NULL,
		PRIMARY KEY(user_id, facility_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Denylist
	//**********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS denylist_entries (
		entry_id integer PRIMARY KEY AUTOINCREMENT,
		device_id text NOT NULL,
		user_id text NOT NULL,
		expires_at integer NOT NULL,
		source text NOT NULL,
		created_by text NOT NULL,
		created_at datetime DEFAULT (unixepoch()),
		UNIQUE(device_id, user_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_denylist_user ON denylist_entries(user_id)")
		.execute(&mut *tx)
		.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_denylist_expires ON denylist_entries(expires_at)",
	)
	.execute(&mut *tx)
	.await?;

	// Route pass issuances
	//**********************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS route_pass_issuances (
		jti text NOT NULL,
		user_id text NOT NULL,
		device_id text NOT NULL,
		audiences_json json NOT NULL,
		issued_at integer NOT NULL,
		expires_at integer NOT NULL,
		PRIMARY KEY(jti)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_issuances_user ON route_pass_issuances(user_id, expires_at)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
