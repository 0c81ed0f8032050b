//! User device operations
//!
//! Enrollment keeps at most one usable (pending-key or active) row per
//! `(user_id, app_device_id)`; revocation is terminal.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

use blulok::directory_adapter::{NewUserDevice, UserDevice};
use blulok::prelude::*;
use blulok::types::DeviceStatus;

fn map_device(row: &SqliteRow) -> ClResult<UserDevice> {
	let status: &str = row.try_get("status").or(Err(Error::DbError))?;
	Ok(UserDevice {
		id: row.try_get("device_id").or(Err(Error::DbError))?,
		user_id: row.try_get("user_id").or(Err(Error::DbError))?,
		app_device_id: row.try_get("app_device_id").or(Err(Error::DbError))?,
		status: DeviceStatus::from_str(status)?,
		public_key: row.try_get("public_key").or(Err(Error::DbError))?,
		updated_at: row.try_get("updated_at").map(Timestamp).or(Err(Error::DbError))?,
	})
}

pub(crate) async fn create(db: &SqlitePool, device: &NewUserDevice<'_>) -> ClResult<()> {
	let usable: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM user_devices
		WHERE user_id=? AND app_device_id=? AND status IN ('pending_key', 'active')",
	)
	.bind(device.user_id)
	.bind(device.app_device_id)
	.fetch_one(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	if usable > 0 {
		return Err(Error::Conflict(format!(
			"device already enrolled for {} / {}",
			device.user_id, device.app_device_id
		)));
	}

	sqlx::query(
		"INSERT INTO user_devices (device_id, user_id, app_device_id, status, created_at, updated_at)
		VALUES (?, ?, ?, 'pending_key', unixepoch(), unixepoch())",
	)
	.bind(device.id)
	.bind(device.user_id)
	.bind(device.app_device_id)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	Ok(())
}

pub(crate) async fn read(
	db: &SqlitePool,
	user_id: &str,
	app_device_id: &str,
) -> ClResult<UserDevice> {
	let res = sqlx::query(
		"SELECT device_id, user_id, app_device_id, status, public_key, updated_at
		FROM user_devices
		WHERE user_id=? AND app_device_id=? AND status IN ('pending_key', 'active')
		ORDER BY updated_at DESC LIMIT 1",
	)
	.bind(user_id)
	.bind(app_device_id)
	.fetch_one(db)
	.await;

	match res {
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			warn!("DB: {:#?}", err);
			Err(Error::DbError)
		}
		Ok(row) => map_device(&row),
	}
}

pub(crate) async fn read_latest(db: &SqlitePool, user_id: &str) -> ClResult<UserDevice> {
	let res = sqlx::query(
		"SELECT device_id, user_id, app_device_id, status, public_key, updated_at
		FROM user_devices
		WHERE user_id=? AND status IN ('pending_key', 'active')
		ORDER BY updated_at DESC LIMIT 1",
	)
	.bind(user_id)
	.fetch_one(db)
	.await;

	match res {
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			warn!("DB: {:#?}", err);
			Err(Error::DbError)
		}
		Ok(row) => map_device(&row),
	}
}

pub(crate) async fn attest_key(
	db: &SqlitePool,
	user_id: &str,
	app_device_id: &str,
	public_key: &str,
) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE user_devices SET public_key=?, status='active', updated_at=unixepoch()
		WHERE user_id=? AND app_device_id=? AND status IN ('pending_key', 'active')",
	)
	.bind(public_key)
	.bind(user_id)
	.bind(app_device_id)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn update_status(
	db: &SqlitePool,
	device_id: &str,
	status: DeviceStatus,
) -> ClResult<()> {
	let current: Option<String> =
		sqlx::query_scalar("SELECT status FROM user_devices WHERE device_id=?")
			.bind(device_id)
			.fetch_optional(db)
			.await
			.inspect_err(|err| warn!("DB: {:#?}", err))
			.map_err(|_| Error::DbError)?;
	let Some(current) = current else {
		return Err(Error::NotFound);
	};

	let current = DeviceStatus::from_str(&current)?;
	if !current.may_become(status) {
		return Err(Error::Conflict(format!(
			"device status {} cannot become {}",
			current.as_str(),
			status.as_str()
		)));
	}

	sqlx::query("UPDATE user_devices SET status=?, updated_at=unixepoch() WHERE device_id=?")
		.bind(status.as_str())
		.bind(device_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	Ok(())
}

// vim: ts=4
