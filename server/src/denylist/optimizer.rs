//! Denylist command optimizer.
//!
//! Elides commands that cannot affect any live token. A skipped command
//! never skips the store write: entries are always recorded for audit, and
//! the store remains identical whether or not the optimizer fires.

use crate::denylist_adapter::{DenylistAdapter, DenylistEntry};
use crate::prelude::*;

/// True iff the user holds no recorded route pass that is still live.
///
/// Without a live pass the user cannot present anything to a lock until they
/// reauthenticate, and reauthentication re-checks state; the uplink command
/// would be wasted.
pub async fn should_skip_denylist_add(
	denylist: &dyn DenylistAdapter,
	user_id: &str,
	now: Timestamp,
) -> ClResult<bool> {
	Ok(denylist.count_live_issuances(user_id, now).await? == 0)
}

/// True iff the entry is already past its expiry: locks drop their own
/// entries at the embedded `exp`, so only the store needs cleaning.
pub fn should_skip_denylist_remove(entry: &DenylistEntry, now: Timestamp) -> bool {
	entry.expires_at <= now
}


// vim: ts=4
