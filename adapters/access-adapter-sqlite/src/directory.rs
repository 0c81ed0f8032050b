//! Users, facility hierarchy and unit assignment operations

use sqlx::{QueryBuilder, Row, SqlitePool};
use std::str::FromStr;

use blulok::directory_adapter::{LockPlacement, LockRef, UserRecord};
use blulok::prelude::*;
use blulok::types::Role;

use crate::utils::push_in;

// Users
//*******

pub(crate) async fn create_user(db: &SqlitePool, user: &UserRecord) -> ClResult<()> {
	sqlx::query("INSERT INTO users (user_id, role, is_active, created_at) VALUES (?, ?, ?, unixepoch())")
		.bind(user.id.as_ref())
		.bind(user.role.as_str())
		.bind(user.active)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn read_user(db: &SqlitePool, user_id: &str) -> ClResult<UserRecord> {
	let res = sqlx::query("SELECT user_id, role, is_active FROM users WHERE user_id=?")
		.bind(user_id)
		.fetch_one(db)
		.await;

	match res {
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			warn!("DB: {:#?}", err);
			Err(Error::DbError)
		}
		Ok(row) => {
			let role: &str = row.try_get("role").or(Err(Error::DbError))?;
			Ok(UserRecord {
				id: row.try_get("user_id").or(Err(Error::DbError))?,
				role: Role::from_str(role)?,
				active: row.try_get("is_active").or(Err(Error::DbError))?,
			})
		}
	}
}

pub(crate) async fn update_user_active(
	db: &SqlitePool,
	user_id: &str,
	active: bool,
) -> ClResult<()> {
	let res = sqlx::query("UPDATE users SET is_active=? WHERE user_id=?")
		.bind(active)
		.bind(user_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

// Facility hierarchy
//********************

pub(crate) async fn create_facility(db: &SqlitePool, facility_id: &str) -> ClResult<()> {
	sqlx::query("INSERT INTO facilities (facility_id) VALUES (?)")
		.bind(facility_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn create_unit(db: &SqlitePool, unit_id: &str, facility_id: &str) -> ClResult<()> {
	sqlx::query("INSERT INTO units (unit_id, facility_id) VALUES (?, ?)")
		.bind(unit_id)
		.bind(facility_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn create_lock(db: &SqlitePool, lock_id: &str, unit_id: &str) -> ClResult<()> {
	sqlx::query("INSERT INTO locks (lock_id, unit_id) VALUES (?, ?)")
		.bind(lock_id)
		.bind(unit_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn list_all_lock_ids(db: &SqlitePool) -> ClResult<Vec<Box<str>>> {
	let rows = sqlx::query_scalar("SELECT lock_id FROM locks ORDER BY lock_id")
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(rows)
}

pub(crate) async fn list_lock_ids_by_facilities(
	db: &SqlitePool,
	facility_ids: &[Box<str>],
) -> ClResult<Vec<Box<str>>> {
	if facility_ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut query = QueryBuilder::new(
		"SELECT l.lock_id FROM locks l JOIN units u ON u.unit_id=l.unit_id WHERE u.facility_id IN ",
	);
	push_in(&mut query, facility_ids);
	query.push(" ORDER BY l.lock_id");

	let rows = query
		.build_query_scalar()
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(rows)
}

pub(crate) async fn read_lock_facility(db: &SqlitePool, lock_id: &str) -> ClResult<LockPlacement> {
	let res = sqlx::query(
		"SELECT l.unit_id, u.facility_id FROM locks l JOIN units u ON u.unit_id=l.unit_id
		WHERE l.lock_id=?",
	)
	.bind(lock_id)
	.fetch_one(db)
	.await;

	match res {
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			warn!("DB: {:#?}", err);
			Err(Error::DbError)
		}
		Ok(row) => Ok(LockPlacement {
			unit_id: row.try_get("unit_id").or(Err(Error::DbError))?,
			facility_id: row.try_get("facility_id").or(Err(Error::DbError))?,
		}),
	}
}

pub(crate) async fn list_locks_for_units(
	db: &SqlitePool,
	unit_ids: &[Box<str>],
) -> ClResult<Vec<LockRef>> {
	if unit_ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut query = QueryBuilder::new(
		"SELECT l.lock_id, l.unit_id, u.facility_id FROM locks l
		JOIN units u ON u.unit_id=l.unit_id WHERE l.unit_id IN ",
	);
	push_in(&mut query, unit_ids);
	query.push(" ORDER BY l.lock_id");

	let rows = query
		.build()
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	rows.into_iter()
		.map(|row| {
			Ok(LockRef {
				lock_id: row.try_get("lock_id").or(Err(Error::DbError))?,
				unit_id: row.try_get("unit_id").or(Err(Error::DbError))?,
				facility_id: row.try_get("facility_id").or(Err(Error::DbError))?,
			})
		})
		.collect()
}

// Assignments
//*************

pub(crate) async fn upsert_assignment(
	db: &SqlitePool,
	unit_id: &str,
	tenant_id: &str,
	primary: bool,
) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO unit_assignments (unit_id, tenant_id, is_primary) VALUES (?, ?, ?)
		ON CONFLICT(unit_id, tenant_id) DO UPDATE SET is_primary=excluded.is_primary",
	)
	.bind(unit_id)
	.bind(tenant_id)
	.bind(primary)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn remove_assignment(
	db: &SqlitePool,
	unit_id: &str,
	tenant_id: &str,
) -> ClResult<()> {
	sqlx::query("DELETE FROM unit_assignments WHERE unit_id=? AND tenant_id=?")
		.bind(unit_id)
		.bind(tenant_id)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn list_assigned_lock_ids(
	db: &SqlitePool,
	user_id: &str,
) -> ClResult<Vec<Box<str>>> {
	let rows = sqlx::query_scalar(
		"SELECT l.lock_id FROM locks l
		JOIN unit_assignments ua ON ua.unit_id=l.unit_id
		WHERE ua.tenant_id=? ORDER BY l.lock_id",
	)
	.bind(user_id)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(rows)
}

pub(crate) async fn list_assigned_unit_ids(
	db: &SqlitePool,
	user_id: &str,
) -> ClResult<Vec<Box<str>>> {
	let rows = sqlx::query_scalar(
		"SELECT unit_id FROM unit_assignments WHERE tenant_id=? ORDER BY unit_id",
	)
	.bind(user_id)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(rows)
}

pub(crate) async fn list_user_facility_ids(
	db: &SqlitePool,
	user_id: &str,
) -> ClResult<Vec<Box<str>>> {
	let rows = sqlx::query_scalar(
		"SELECT DISTINCT u.facility_id FROM unit_assignments ua
		JOIN units u ON u.unit_id=ua.unit_id WHERE ua.tenant_id=?
		UNION
		SELECT facility_id FROM user_facility_schedules WHERE user_id=?
		ORDER BY facility_id",
	)
	.bind(user_id)
	.bind(user_id)
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(rows)
}

// vim: ts=4
