//! Key sharing operations
//!
//! A share is live when `is_active` is set and `expires_at` is null or in
//! the future; every read here filters on liveness.

use sqlx::{Row, SqlitePool};

use blulok::directory_adapter::{NewKeySharing, SharedLock};
use blulok::prelude::*;

pub(crate) async fn create(db: &SqlitePool, sharing: &NewKeySharing<'_>) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO key_sharing
		(sharing_id, unit_id, primary_tenant_id, shared_with_user_id, is_active, expires_at, created_at)
		VALUES (?, ?, ?, ?, 1, ?, unixepoch())",
	)
	.bind(sharing.id)
	.bind(sharing.unit_id)
	.bind(sharing.primary_tenant_id)
	.bind(sharing.shared_with_user_id)
	.bind(sharing.expires_at.map(|ts| ts.0))
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn revoke(db: &SqlitePool, sharing_id: &str) -> ClResult<()> {
	let res = sqlx::query("UPDATE key_sharing SET is_active=0 WHERE sharing_id=?")
		.bind(sharing_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn list_shared_locks(
	db: &SqlitePool,
	user_id: &str,
	now: Timestamp,
) -> ClResult<Vec<SharedLock>> {
	let rows = sqlx::query(
		"SELECT ks.primary_tenant_id, l.lock_id, l.unit_id, u.facility_id
		FROM key_sharing ks
		JOIN locks l ON l.unit_id=ks.unit_id
		JOIN units u ON u.unit_id=ks.unit_id
		WHERE ks.shared_with_user_id=? AND ks.is_active=1
			AND (ks.expires_at IS NULL OR ks.expires_at>?)
		ORDER BY l.lock_id",
	)
	.bind(user_id)
	.bind(now.0)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	rows.into_iter()
		.map(|row| {
			Ok(SharedLock {
				primary_tenant_id: row.try_get("primary_tenant_id").or(Err(Error::DbError))?,
				lock_id: row.try_get("lock_id").or(Err(Error::DbError))?,
				unit_id: row.try_get("unit_id").or(Err(Error::DbError))?,
				facility_id: row.try_get("facility_id").or(Err(Error::DbError))?,
			})
		})
		.collect()
}

pub(crate) async fn list_shared_unit_ids(
	db: &SqlitePool,
	user_id: &str,
	now: Timestamp,
) -> ClResult<Vec<Box<str>>> {
	let rows = sqlx::query_scalar(
		"SELECT DISTINCT unit_id FROM key_sharing
		WHERE shared_with_user_id=? AND is_active=1
			AND (expires_at IS NULL OR expires_at>?)
		ORDER BY unit_id",
	)
	.bind(user_id)
	.bind(now.0)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(rows)
}

// vim: ts=4
