//! Adapter for the cloud-to-gateway command sink.
//!
//! Delivery is best-effort, non-transactional, and unordered across
//! facilities; the cascade listener preserves per-facility order by handing
//! commands over one at a time.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

/// A BluLok gateway sink
#[async_trait]
pub trait GatewayAdapter: Debug + Send + Sync {
	/// Hands one signed command envelope to the facility's gateway link
	async fn unicast_to_facility(&self, facility_id: &str, command: &str) -> ClResult<()>;
}

/// Gateway sink that logs and drops every command.
///
/// Used when no live gateway link is wired in; the denylist store still
/// records revocation intent, so nothing is lost beyond latency.
#[derive(Debug, Default)]
pub struct LogGatewayAdapter;

#[async_trait]
impl GatewayAdapter for LogGatewayAdapter {
	async fn unicast_to_facility(&self, facility_id: &str, command: &str) -> ClResult<()> {
		debug!("unicast to facility {}: {} bytes (dropped, no gateway link)", facility_id, command.len());
		Ok(())
	}
}

// vim: ts=4
