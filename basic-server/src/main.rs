//! Minimal BluLok access-core server: SQLite access adapter, logging
//! gateway sink, configuration from the environment.

use std::{env, path::PathBuf, sync::Arc};

use blulok::AppBuilder;
use blulok_access_adapter_sqlite::AccessAdapterSqlite;

fn env_u32(name: &str, default: u32) -> u32 {
	env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn required_env(name: &str) -> Result<String, Box<dyn std::error::Error>> {
	env::var(name).map_err(|_| format!("missing required environment variable {}", name).into())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
	let db_dir = PathBuf::from(env::var("DB_DIR").unwrap_or_else(|_| "./data".to_string()));
	tokio::fs::create_dir_all(&db_dir).await?;
	let access_adapter = Arc::new(AccessAdapterSqlite::new(db_dir.join("access.db")).await?);

	let private_key = required_env("OPERATOR_PRIVATE_KEY_B64")?;
	let public_key = required_env("OPERATOR_PUBLIC_KEY_B64")?;

	let mut builder = AppBuilder::new();
	builder
		.operator_keys(private_key, public_key)
		.route_pass_ttl_hours(env_u32("ROUTE_PASS_TTL_HOURS", 24))
		.fallback_iat_skew_seconds(env_u32("FALLBACK_IAT_SKEW_SECONDS", 10))
		.prune_interval_seconds(env_u32("PRUNE_INTERVAL_SECONDS", 300))
		.directory_adapter(access_adapter.clone())
		.denylist_adapter(access_adapter);
	let app = builder.build()?;

	blulok::serve(&app)?;
	tokio::signal::ctrl_c().await?;
	blulok::shutdown(&app).await?;

	Ok(())
}

#[tokio::main]
async fn main() {
	if let Err(err) = run().await {
		eprintln!("FATAL: {}", err);
		std::process::exit(1);
	}
}

// vim: ts=4
