//! Schedule resolver.
//!
//! Determines the optional `schedule` claim of a route pass: the user's own
//! binding in their first facility, or, for shared-key access, the primary
//! tenant's binding in the shared lock's facility. Window sets that violate
//! the half-open non-overlap rule are rejected outright rather than carried
//! into a token.

use serde::{Deserialize, Serialize};

use crate::directory_adapter::{DirectoryAdapter, ScheduleWindows};
use crate::pass::audience::parse_shared_key;
use crate::prelude::*;
use crate::types::TimeWindow;

/// The `schedule` claim of a route pass
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScheduleClaim {
	pub facility_id: Box<str>,
	pub time_windows: Vec<TimeWindow>,
}

/// Validates a window set: day index 0-6, `start < end`, and pairwise
/// non-overlap per day under the half-open `[start, end)` rule. Adjacent
/// windows are allowed.
pub fn validate_windows(windows: &[TimeWindow]) -> ClResult<()> {
	for w in windows {
		if w.day_of_week > 6 {
			return Err(Error::ValidationError(format!(
				"day_of_week out of range: {}",
				w.day_of_week
			)));
		}
		if w.start_time >= w.end_time {
			return Err(Error::ValidationError(format!(
				"time window start {} is not before end {}",
				w.start_time, w.end_time
			)));
		}
	}

	for day in 0..=6u8 {
		let mut day_windows: Vec<&TimeWindow> =
			windows.iter().filter(|w| w.day_of_week == day).collect();
		day_windows.sort_by_key(|w| w.start_time);
		for pair in day_windows.windows(2) {
			if pair[1].start_time < pair[0].end_time {
				return Err(Error::ValidationError(format!(
					"overlapping time windows on day {}",
					day
				)));
			}
		}
	}

	Ok(())
}

fn claim_from(windows: ScheduleWindows) -> ClResult<ScheduleClaim> {
	validate_windows(&windows.windows)?;
	Ok(ScheduleClaim { facility_id: windows.facility_id, time_windows: windows.windows })
}

/// Resolves the schedule claim for a pass.
///
/// Scope is the explicit `facility_ids` parameter when given, otherwise the
/// user's facility associations. With a non-empty scope the user's binding
/// in the first facility wins; failing that, the first `shared_key:`
/// audience inherits the primary tenant's binding in the shared lock's
/// facility.
pub async fn resolve(
	directory: &dyn DirectoryAdapter,
	user_id: &str,
	facility_ids: Option<&[Box<str>]>,
	audiences: &[Box<str>],
) -> ClResult<Option<ScheduleClaim>> {
	let associations;
	let scope: &[Box<str>] = match facility_ids {
		Some(ids) => ids,
		None => {
			associations = directory.list_user_facility_ids(user_id).await?;
			&associations
		}
	};

	if let Some(first) = scope.first() {
		if let Some(windows) = directory.read_user_facility_schedule(user_id, first).await? {
			if !windows.windows.is_empty() {
				return Ok(Some(claim_from(windows)?));
			}
		}
	}

	if let Some((primary_tenant_id, lock_id)) =
		audiences.iter().find_map(|aud| parse_shared_key(aud))
	{
		let placement = directory.read_lock_facility(lock_id).await?;
		if let Some(windows) = directory
			.read_user_facility_schedule(primary_tenant_id, &placement.facility_id)
			.await?
		{
			if !windows.windows.is_empty() {
				return Ok(Some(claim_from(windows)?));
			}
		}
	}

	Ok(None)
}


// vim: ts=4
