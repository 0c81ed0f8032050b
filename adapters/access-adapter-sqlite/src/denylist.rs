//! Denylist store operations
//!
//! Upsert keeps at most one row per `(device_id, user_id)`: re-creation
//! extends `expires_at` to the later value and takes the last writer's
//! source and author.

use sqlx::{QueryBuilder, Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

use blulok::denylist_adapter::{DenylistEntry, FacilityDenylistEntry, NewDenylistEntry};
use blulok::prelude::*;
use blulok::types::DenylistSource;

use crate::utils::push_in;

fn map_entry(row: &SqliteRow) -> ClResult<DenylistEntry> {
	let source: &str = row.try_get("source").or(Err(Error::DbError))?;
	Ok(DenylistEntry {
		id: row.try_get("entry_id").or(Err(Error::DbError))?,
		device_id: row.try_get("device_id").or(Err(Error::DbError))?,
		user_id: row.try_get("user_id").or(Err(Error::DbError))?,
		expires_at: row.try_get("expires_at").map(Timestamp).or(Err(Error::DbError))?,
		source: DenylistSource::from_str(source)?,
		created_by: row.try_get("created_by").or(Err(Error::DbError))?,
		created_at: row.try_get("created_at").map(Timestamp).or(Err(Error::DbError))?,
	})
}

pub(crate) async fn create(db: &SqlitePool, entry: &NewDenylistEntry<'_>) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO denylist_entries (device_id, user_id, expires_at, source, created_by, created_at)
		VALUES (?, ?, ?, ?, ?, unixepoch())
		ON CONFLICT(device_id, user_id) DO UPDATE SET
			expires_at=MAX(denylist_entries.expires_at, excluded.expires_at),
			source=excluded.source,
			created_by=excluded.created_by",
	)
	.bind(entry.device_id)
	.bind(entry.user_id)
	.bind(entry.expires_at.0)
	.bind(entry.source.as_str())
	.bind(entry.created_by)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn find_by_device(
	db: &SqlitePool,
	device_id: &str,
) -> ClResult<Vec<DenylistEntry>> {
	let rows = sqlx::query(
		"SELECT entry_id, device_id, user_id, expires_at, source, created_by, created_at
		FROM denylist_entries WHERE device_id=? ORDER BY entry_id",
	)
	.bind(device_id)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	rows.iter().map(map_entry).collect()
}

pub(crate) async fn find_by_user(db: &SqlitePool, user_id: &str) -> ClResult<Vec<DenylistEntry>> {
	let rows = sqlx::query(
		"SELECT entry_id, device_id, user_id, expires_at, source, created_by, created_at
		FROM denylist_entries WHERE user_id=? ORDER BY entry_id",
	)
	.bind(user_id)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	rows.iter().map(map_entry).collect()
}

pub(crate) async fn find_by_units_and_user(
	db: &SqlitePool,
	unit_ids: &[Box<str>],
	user_id: &str,
) -> ClResult<Vec<FacilityDenylistEntry>> {
	if unit_ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut query = QueryBuilder::new(
		"SELECT d.entry_id, d.device_id, d.user_id, d.expires_at, d.source, d.created_by, d.created_at,
			u.facility_id
		FROM denylist_entries d
		JOIN locks l ON l.lock_id=d.device_id
		JOIN units u ON u.unit_id=l.unit_id
		WHERE d.user_id=",
	);
	query.push_bind(user_id);
	query.push(" AND l.unit_id IN ");
	push_in(&mut query, unit_ids);
	query.push(" ORDER BY d.entry_id");

	let rows = query
		.build()
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	rows.iter()
		.map(|row| {
			Ok(FacilityDenylistEntry {
				entry: map_entry(row)?,
				facility_id: row.try_get("facility_id").or(Err(Error::DbError))?,
			})
		})
		.collect()
}

pub(crate) async fn remove(db: &SqlitePool, device_id: &str, user_id: &str) -> ClResult<()> {
	sqlx::query("DELETE FROM denylist_entries WHERE device_id=? AND user_id=?")
		.bind(device_id)
		.bind(user_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn delete_expired(db: &SqlitePool, now: Timestamp) -> ClResult<u32> {
	let res = sqlx::query("DELETE FROM denylist_entries WHERE expires_at<=?")
		.bind(now.0)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(u32::try_from(res.rows_affected()).unwrap_or(u32::MAX))
}

// vim: ts=4
