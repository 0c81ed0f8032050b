//! Denylist store and issuance log integration tests

use tempfile::TempDir;

use blulok::denylist_adapter::{DenylistAdapter, NewDenylistEntry, RoutePassIssuance};
use blulok::directory_adapter::DirectoryAdapter;
use blulok::types::{DenylistSource, Timestamp};
use blulok_access_adapter_sqlite::AccessAdapterSqlite;

async fn create_test_adapter() -> (AccessAdapterSqlite, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = AccessAdapterSqlite::new(temp_dir.path().join("access.db"))
		.await
		.expect("Failed to create adapter");
	(adapter, temp_dir)
}

fn entry<'a>(
	device_id: &'a str,
	user_id: &'a str,
	expires_at: i64,
	source: DenylistSource,
	created_by: &'a str,
) -> NewDenylistEntry<'a> {
	NewDenylistEntry { device_id, user_id, expires_at: Timestamp(expires_at), source, created_by }
}

#[tokio::test]
async fn test_upsert_keeps_later_expiry_and_last_writer() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter
		.create_entry(&entry("l1", "t1", 1000, DenylistSource::UnitUnassignment, "admin-1"))
		.await
		.unwrap();
	// earlier expiry must not shorten the entry; source/author follow the writer
	adapter
		.create_entry(&entry("l1", "t1", 500, DenylistSource::FmsSync, "fms-sync"))
		.await
		.unwrap();

	let entries = adapter.find_by_user("t1").await.unwrap();
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].expires_at, Timestamp(1000));
	assert_eq!(entries[0].source, DenylistSource::FmsSync);
	assert_eq!(entries[0].created_by.as_ref(), "fms-sync");

	// later expiry extends
	adapter
		.create_entry(&entry("l1", "t1", 2000, DenylistSource::UserDeactivation, "admin-2"))
		.await
		.unwrap();
	let entries = adapter.find_by_user("t1").await.unwrap();
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].expires_at, Timestamp(2000));
	assert_eq!(entries[0].source, DenylistSource::UserDeactivation);
}

#[tokio::test]
async fn test_find_by_device_and_user() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter
		.create_entry(&entry("l1", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter
		.create_entry(&entry("l2", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter
		.create_entry(&entry("l1", "t2", 1000, DenylistSource::KeySharingRevocation, "p1"))
		.await
		.unwrap();

	assert_eq!(adapter.find_by_user("t1").await.unwrap().len(), 2);
	assert_eq!(adapter.find_by_device("l1").await.unwrap().len(), 2);
	assert_eq!(adapter.find_by_device("l3").await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_find_by_units_and_user_joins_facility() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.create_facility("f1").await.unwrap();
	adapter.create_unit("u1", "f1").await.unwrap();
	adapter.create_lock("l1", "u1").await.unwrap();
	adapter.create_facility("f2").await.unwrap();
	adapter.create_unit("u2", "f2").await.unwrap();
	adapter.create_lock("l2", "u2").await.unwrap();

	adapter
		.create_entry(&entry("l1", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter
		.create_entry(&entry("l2", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();

	let found = adapter.find_by_units_and_user(&["u1".into()], "t1").await.unwrap();
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].entry.device_id.as_ref(), "l1");
	assert_eq!(found[0].facility_id.as_ref(), "f1");

	let both = adapter
		.find_by_units_and_user(&["u1".into(), "u2".into()], "t1")
		.await
		.unwrap();
	assert_eq!(both.len(), 2);

	assert!(adapter.find_by_units_and_user(&[], "t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_entry() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter
		.create_entry(&entry("l1", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter.remove_entry("l1", "t1").await.unwrap();
	assert!(adapter.find_by_user("t1").await.unwrap().is_empty());

	// removing an absent pair is not an error
	adapter.remove_entry("l1", "t1").await.unwrap();
}

#[tokio::test]
async fn test_delete_expired_is_bounded_and_idempotent() {
	let (adapter, _temp) = create_test_adapter().await;
	let now = Timestamp(1000);

	adapter
		.create_entry(&entry("l1", "t1", 999, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter
		.create_entry(&entry("l2", "t1", 1000, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();
	adapter
		.create_entry(&entry("l3", "t1", 1001, DenylistSource::UnitUnassignment, "system"))
		.await
		.unwrap();

	// exactly the rows with expires_at <= now go away
	assert_eq!(adapter.delete_expired(now).await.unwrap(), 2);
	let remaining = adapter.find_by_user("t1").await.unwrap();
	assert_eq!(remaining.len(), 1);
	assert_eq!(remaining[0].device_id.as_ref(), "l3");

	// repeated pruning within the same tick removes nothing more
	assert_eq!(adapter.delete_expired(now).await.unwrap(), 0);
}

#[tokio::test]
async fn test_issuance_log_and_live_count() {
	let (adapter, _temp) = create_test_adapter().await;
	let now = Timestamp(1000);

	adapter
		.create_issuance(&RoutePassIssuance {
			jti: "jti-1".into(),
			user_id: "t1".into(),
			device_id: "dev-1".into(),
			audiences: vec!["lock:l1".into(), "shared_key:p2:l2".into()],
			issued_at: Timestamp(900),
			expires_at: Timestamp(1001),
		})
		.await
		.unwrap();
	adapter
		.create_issuance(&RoutePassIssuance {
			jti: "jti-2".into(),
			user_id: "t1".into(),
			device_id: "dev-1".into(),
			audiences: vec![],
			issued_at: Timestamp(500),
			expires_at: Timestamp(1000),
		})
		.await
		.unwrap();

	// expires_at > now is the liveness boundary
	assert_eq!(adapter.count_live_issuances("t1", now).await.unwrap(), 1);
	assert_eq!(adapter.count_live_issuances("t1", Timestamp(1001)).await.unwrap(), 0);
	assert_eq!(adapter.count_live_issuances("nobody", now).await.unwrap(), 0);
}
