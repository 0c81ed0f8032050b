//! Adapter for the denylist store and the route-pass issuance audit log.
//!
//! The denylist table is the source of truth for revocation intent: cascade
//! handlers write it before any command leaves for a gateway, and the pruner
//! is the only thing that deletes entries on expiry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::DenylistSource;

/// A persisted denylist row
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DenylistEntry {
	pub id: i64,
	pub device_id: Box<str>,
	pub user_id: Box<str>,
	pub expires_at: Timestamp,
	pub source: DenylistSource,
	pub created_by: Box<str>,
	pub created_at: Timestamp,
}

/// Data needed to create (or refresh) a denylist entry
#[derive(Debug)]
pub struct NewDenylistEntry<'a> {
	pub device_id: &'a str,
	pub user_id: &'a str,
	pub expires_at: Timestamp,
	pub source: DenylistSource,
	pub created_by: &'a str,
}

/// A denylist entry joined with the facility its lock belongs to
#[derive(Clone, Debug)]
pub struct FacilityDenylistEntry {
	pub entry: DenylistEntry,
	pub facility_id: Box<str>,
}

/// Append-only audit record of one route-pass issuance
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoutePassIssuance {
	pub jti: Box<str>,
	pub user_id: Box<str>,
	pub device_id: Box<str>,
	pub audiences: Vec<Box<str>>,
	pub issued_at: Timestamp,
	pub expires_at: Timestamp,
}

/// A BluLok denylist adapter
///
/// Uniqueness contract: at most one live entry per `(device_id, user_id)`;
/// re-creation keeps the later `expires_at` and the last writer's `source`
/// and `created_by`.
#[async_trait]
pub trait DenylistAdapter: Debug + Send + Sync {
	/// Upserts an entry on `(device_id, user_id)`, keeping the later expiry
	async fn create_entry(&self, entry: &NewDenylistEntry<'_>) -> ClResult<()>;

	async fn find_by_device(&self, device_id: &str) -> ClResult<Vec<DenylistEntry>>;
	async fn find_by_user(&self, user_id: &str) -> ClResult<Vec<DenylistEntry>>;

	/// Entries of the user on locks belonging to any of `unit_ids`, each
	/// joined with its facility
	async fn find_by_units_and_user(
		&self,
		unit_ids: &[Box<str>],
		user_id: &str,
	) -> ClResult<Vec<FacilityDenylistEntry>>;

	async fn remove_entry(&self, device_id: &str, user_id: &str) -> ClResult<()>;

	/// Bulk-deletes every entry with `expires_at <= now`; returns the count
	async fn delete_expired(&self, now: Timestamp) -> ClResult<u32>;

	// Route pass issuance audit
	async fn create_issuance(&self, issuance: &RoutePassIssuance) -> ClResult<()>;

	/// Number of recorded issuances of the user with `expires_at > now`
	async fn count_live_issuances(&self, user_id: &str, now: Timestamp) -> ClResult<u32>;
}

// vim: ts=4
