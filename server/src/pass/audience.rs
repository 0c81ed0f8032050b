//! Audience resolver.
//!
//! Maps `(user, role, facility scope)` to the audience strings a route pass
//! carries. Two forms exist: `lock:<lockId>` grants unrestricted use of a
//! lock, `shared_key:<primaryTenantId>:<lockId>` grants use under the
//! primary tenant's schedule. A lock reachable both ways appears in both
//! forms.

use itertools::Itertools;

use crate::directory_adapter::DirectoryAdapter;
use crate::prelude::*;
use crate::types::Role;

pub const LOCK_PREFIX: &str = "lock:";
pub const SHARED_KEY_PREFIX: &str = "shared_key:";

pub fn lock_audience(lock_id: &str) -> Box<str> {
	format!("{}{}", LOCK_PREFIX, lock_id).into()
}

pub fn shared_key_audience(primary_tenant_id: &str, lock_id: &str) -> Box<str> {
	format!("{}{}:{}", SHARED_KEY_PREFIX, primary_tenant_id, lock_id).into()
}

/// Splits a `shared_key:<primary>:<lock>` audience into its parts
pub fn parse_shared_key(audience: &str) -> Option<(&str, &str)> {
	audience.strip_prefix(SHARED_KEY_PREFIX)?.split_once(':')
}

/// Resolves the deduplicated audience set for a user.
///
/// `facility_ids` is the caller's explicit facility scope; only
/// `FACILITY_ADMIN` consults it (empty scope means no audiences).
pub async fn resolve(
	directory: &dyn DirectoryAdapter,
	user_id: &str,
	role: Role,
	facility_ids: Option<&[Box<str>]>,
) -> ClResult<Vec<Box<str>>> {
	let audiences: Vec<Box<str>> = match role {
		Role::DevAdmin | Role::Admin => {
			directory.list_all_lock_ids().await?.iter().map(|id| lock_audience(id)).collect()
		}
		Role::FacilityAdmin => match facility_ids {
			Some(ids) if !ids.is_empty() => directory
				.list_lock_ids_by_facilities(ids)
				.await?
				.iter()
				.map(|id| lock_audience(id))
				.collect(),
			_ => Vec::new(),
		},
		Role::Tenant => {
			let direct = directory.list_assigned_lock_ids(user_id).await?;
			let shared = directory.list_shared_locks(user_id, Timestamp::now()).await?;
			direct
				.iter()
				.map(|id| lock_audience(id))
				.chain(
					shared
						.iter()
						.map(|s| shared_key_audience(&s.primary_tenant_id, &s.lock_id)),
				)
				.collect()
		}
		Role::Maintenance => Vec::new(),
	};

	Ok(audiences.into_iter().unique().collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_audience_grammar() {
		assert_eq!(lock_audience("l1").as_ref(), "lock:l1");
		assert_eq!(shared_key_audience("p2", "l2").as_ref(), "shared_key:p2:l2");
	}

	#[test]
	fn test_parse_shared_key() {
		assert_eq!(parse_shared_key("shared_key:p2:l2"), Some(("p2", "l2")));
		assert_eq!(parse_shared_key("lock:l1"), None);
		assert_eq!(parse_shared_key("shared_key:broken"), None);
	}
}

// vim: ts=4
