//! Schedule operations
//!
//! Window sets are validated on create, so a stored schedule always obeys
//! the half-open non-overlap rule.

use chrono::NaiveTime;
use sqlx::{Row, SqlitePool};

use blulok::directory_adapter::{NewSchedule, ScheduleWindows};
use blulok::pass::schedule::validate_windows;
use blulok::prelude::*;
use blulok::types::TimeWindow;

const TIME_FORMAT: &str = "%H:%M:%S";

pub(crate) async fn create(db: &SqlitePool, schedule: &NewSchedule<'_>) -> ClResult<()> {
	validate_windows(schedule.windows)?;

	let mut tx = db.begin().await.map_err(|_| Error::DbError)?;

	sqlx::query("INSERT INTO schedules (schedule_id, facility_id, kind, name) VALUES (?, ?, ?, ?)")
		.bind(schedule.id)
		.bind(schedule.facility_id)
		.bind(schedule.kind.as_str())
		.bind(schedule.name)
		.execute(&mut *tx)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	for window in schedule.windows {
		sqlx::query(
			"INSERT INTO schedule_time_windows (schedule_id, day_of_week, start_time, end_time)
			VALUES (?, ?, ?, ?)",
		)
		.bind(schedule.id)
		.bind(i64::from(window.day_of_week))
		.bind(window.start_time.format(TIME_FORMAT).to_string())
		.bind(window.end_time.format(TIME_FORMAT).to_string())
		.execute(&mut *tx)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	}

	tx.commit().await.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn bind_user_facility(
	db: &SqlitePool,
	user_id: &str,
	facility_id: &str,
	schedule_id: &str,
) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO user_facility_schedules (user_id, facility_id, schedule_id) VALUES (?, ?, ?)
		ON CONFLICT(user_id, facility_id) DO UPDATE SET schedule_id=excluded.schedule_id",
	)
	.bind(user_id)
	.bind(facility_id)
	.bind(schedule_id)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	Ok(())
}

fn parse_time(value: &str) -> ClResult<NaiveTime> {
	NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|err| {
		warn!("stored time {} unparseable: {}", value, err);
		Error::Parse
	})
}

pub(crate) async fn read_user_facility(
	db: &SqlitePool,
	user_id: &str,
	facility_id: &str,
) -> ClResult<Option<ScheduleWindows>> {
	let schedule_id: Option<Box<str>> = sqlx::query_scalar(
		"SELECT schedule_id FROM user_facility_schedules WHERE user_id=? AND facility_id=?",
	)
	.bind(user_id)
	.bind(facility_id)
	.fetch_optional(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;
	let Some(schedule_id) = schedule_id else {
		return Ok(None);
	};

	let rows = sqlx::query(
		"SELECT day_of_week, start_time, end_time FROM schedule_time_windows
		WHERE schedule_id=? ORDER BY day_of_week, start_time",
	)
	.bind(schedule_id.as_ref())
	.fetch_all(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	let windows = rows
		.into_iter()
		.map(|row| {
			let day: i64 = row.try_get("day_of_week").or(Err(Error::DbError))?;
			let start: &str = row.try_get("start_time").or(Err(Error::DbError))?;
			let end: &str = row.try_get("end_time").or(Err(Error::DbError))?;
			Ok(TimeWindow {
				day_of_week: u8::try_from(day).map_err(|_| Error::Parse)?,
				start_time: parse_time(start)?,
				end_time: parse_time(end)?,
			})
		})
		.collect::<ClResult<Vec<_>>>()?;

	Ok(Some(ScheduleWindows { facility_id: facility_id.into(), windows }))
}

// vim: ts=4
