//! Common types used throughout the BluLok access core.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::error::{ClResult, Error};

// Timestamp //
//***********//
/// Seconds since the unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Timestamp {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_secs() as i64)
	}

	pub fn from_now(delta: i64) -> Timestamp {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_secs() as i64 + delta)
	}

	/// Add seconds to this timestamp
	pub fn add_seconds(&self, seconds: i64) -> Timestamp {
		Timestamp(self.0 + seconds)
	}

	pub fn is_past(&self) -> bool {
		*self <= Timestamp::now()
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::cmp::PartialEq for Timestamp {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl std::cmp::Eq for Timestamp {}

impl std::cmp::PartialOrd for Timestamp {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::cmp::Ord for Timestamp {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.0.cmp(&other.0)
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_i64(self.0)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(Timestamp(i64::deserialize(deserializer)?))
	}
}

// Role //
//******//
/// Platform role of a user. Stored and serialized in SCREAMING_SNAKE_CASE.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	DevAdmin,
	Admin,
	FacilityAdmin,
	Tenant,
	Maintenance,
}

impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::DevAdmin => "DEV_ADMIN",
			Role::Admin => "ADMIN",
			Role::FacilityAdmin => "FACILITY_ADMIN",
			Role::Tenant => "TENANT",
			Role::Maintenance => "MAINTENANCE",
		}
	}
}

impl std::str::FromStr for Role {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"DEV_ADMIN" => Ok(Role::DevAdmin),
			"ADMIN" => Ok(Role::Admin),
			"FACILITY_ADMIN" => Ok(Role::FacilityAdmin),
			"TENANT" => Ok(Role::Tenant),
			"MAINTENANCE" => Ok(Role::Maintenance),
			_ => Err(Error::ValidationError(format!("unknown role: {}", s))),
		}
	}
}

// DeviceStatus //
//**************//
/// Enrollment state of a user device.
///
/// `pending_key → active` on public-key attestation, `→ revoked` on user
/// action or deregistration. `revoked` is terminal and forces re-enrollment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
	PendingKey,
	Active,
	Revoked,
}

impl DeviceStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			DeviceStatus::PendingKey => "pending_key",
			DeviceStatus::Active => "active",
			DeviceStatus::Revoked => "revoked",
		}
	}

	/// Whether a route pass may be issued against a device in this state
	pub fn usable_for_issuance(&self) -> bool {
		matches!(self, DeviceStatus::PendingKey | DeviceStatus::Active)
	}

	/// Valid state-machine transitions
	pub fn may_become(&self, next: DeviceStatus) -> bool {
		match (self, next) {
			(DeviceStatus::PendingKey, DeviceStatus::Active) => true,
			(DeviceStatus::PendingKey | DeviceStatus::Active, DeviceStatus::Revoked) => true,
			_ => false,
		}
	}
}

impl std::str::FromStr for DeviceStatus {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"pending_key" => Ok(DeviceStatus::PendingKey),
			"active" => Ok(DeviceStatus::Active),
			"revoked" => Ok(DeviceStatus::Revoked),
			_ => Err(Error::ValidationError(format!("unknown device status: {}", s))),
		}
	}
}

// DenylistSource //
//****************//
/// What caused a denylist entry to be written.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenylistSource {
	UserDeactivation,
	UnitUnassignment,
	FmsSync,
	KeySharingRevocation,
}

impl DenylistSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			DenylistSource::UserDeactivation => "user_deactivation",
			DenylistSource::UnitUnassignment => "unit_unassignment",
			DenylistSource::FmsSync => "fms_sync",
			DenylistSource::KeySharingRevocation => "key_sharing_revocation",
		}
	}
}

impl std::str::FromStr for DenylistSource {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"user_deactivation" => Ok(DenylistSource::UserDeactivation),
			"unit_unassignment" => Ok(DenylistSource::UnitUnassignment),
			"fms_sync" => Ok(DenylistSource::FmsSync),
			"key_sharing_revocation" => Ok(DenylistSource::KeySharingRevocation),
			_ => Err(Error::ValidationError(format!("unknown denylist source: {}", s))),
		}
	}
}

// TimeWindow //
//************//
/// A half-open `[start, end)` interval on one weekday, facility-local time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
	/// 0 = Sunday .. 6 = Saturday
	pub day_of_week: u8,
	pub start_time: NaiveTime,
	pub end_time: NaiveTime,
}

// ScheduleKind //
//**************//
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
	Precanned,
	Custom,
}

impl ScheduleKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ScheduleKind::Precanned => "precanned",
			ScheduleKind::Custom => "custom",
		}
	}
}

impl std::str::FromStr for ScheduleKind {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"precanned" => Ok(ScheduleKind::Precanned),
			"custom" => Ok(ScheduleKind::Custom),
			_ => Err(Error::ValidationError(format!("unknown schedule kind: {}", s))),
		}
	}
}


// vim: ts=4
