//! Route pass issuance log operations
//!
//! Append-only: rows are written once at issuance and only ever read, by
//! the audit surface and by the denylist command optimizer.

use sqlx::SqlitePool;

use blulok::denylist_adapter::RoutePassIssuance;
use blulok::prelude::*;

pub(crate) async fn create(db: &SqlitePool, issuance: &RoutePassIssuance) -> ClResult<()> {
	let audiences_json = serde_json::to_string(&issuance.audiences)?;

	sqlx::query(
		"INSERT INTO route_pass_issuances (jti, user_id, device_id, audiences_json, issued_at, expires_at)
		VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(issuance.jti.as_ref())
	.bind(issuance.user_id.as_ref())
	.bind(issuance.device_id.as_ref())
	.bind(audiences_json)
	.bind(issuance.issued_at.0)
	.bind(issuance.expires_at.0)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn count_live(db: &SqlitePool, user_id: &str, now: Timestamp) -> ClResult<u32> {
	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM route_pass_issuances WHERE user_id=? AND expires_at>?",
	)
	.bind(user_id)
	.bind(now.0)
	.fetch_one(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

// vim: ts=4
