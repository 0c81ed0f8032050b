//! Secure-time packet builder.
//!
//! Locks carry no battery-backed clock worth trusting; gateways broadcast
//! signed time packets, and each lock also receives one at startup. Locks
//! reject packets whose `ts` is not greater than the last one they saw, so
//! replaying an old packet cannot move a lock's clock backwards.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::auth::signer::Signer;
use crate::prelude::*;

pub const CMD_SECURE_TIME_SYNC: &str = "SECURE_TIME_SYNC";

/// Validity of a time packet's own envelope
const TIME_SYNC_TTL_SECONDS: i64 = 60;

/// A signed secure-time packet ready for gateway delivery
#[derive(Clone, Debug)]
pub struct TimeSyncPacket {
	pub ts: Timestamp,
	pub sig: Box<str>,
}

#[skip_serializing_none]
#[derive(Serialize)]
struct TimeSyncBody<'a> {
	cmd_type: &'static str,
	ts: i64,
	lock_id: Option<&'a str>,
}

/// Claims of a time packet, for verification on the receiving side
#[skip_serializing_none]
#[derive(Debug, Deserialize)]
pub struct TimeSyncClaims {
	pub cmd_type: Box<str>,
	pub ts: i64,
	pub lock_id: Option<Box<str>>,
	pub iat: i64,
	pub exp: i64,
	pub jti: Box<str>,
	pub iss: Box<str>,
}

/// Builds the broadcast packet carried to every lock in a facility
pub fn broadcast_packet(signer: &Signer) -> ClResult<TimeSyncPacket> {
	build(signer, None)
}

/// Builds the per-lock packet sent when a single lock (re)starts
pub fn lock_startup_packet(signer: &Signer, lock_id: &str) -> ClResult<TimeSyncPacket> {
	build(signer, Some(lock_id))
}

fn build(signer: &Signer, lock_id: Option<&str>) -> ClResult<TimeSyncPacket> {
	let ts = Timestamp::now();
	let body = TimeSyncBody { cmd_type: CMD_SECURE_TIME_SYNC, ts: ts.0, lock_id };
	let signed = signer.sign(&body, TIME_SYNC_TTL_SECONDS)?;
	Ok(TimeSyncPacket { ts, sig: signed.token })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::signer::tests::test_keypair;

	#[test]
	fn test_broadcast_packet() {
		let (private, public) = test_keypair([3; 32]);
		let signer = Signer::new(&private, &public).unwrap();

		let packet = broadcast_packet(&signer).unwrap();
		let claims: TimeSyncClaims = signer.verify(&packet.sig, None).unwrap();
		assert_eq!(claims.cmd_type.as_ref(), CMD_SECURE_TIME_SYNC);
		assert_eq!(claims.ts, packet.ts.0);
		assert_eq!(claims.lock_id, None);
	}

	#[test]
	fn test_lock_startup_packet_carries_lock_id() {
		let (private, public) = test_keypair([3; 32]);
		let signer = Signer::new(&private, &public).unwrap();

		let packet = lock_startup_packet(&signer, "lock-17").unwrap();
		let claims: TimeSyncClaims = signer.verify(&packet.sig, None).unwrap();
		assert_eq!(claims.lock_id.as_deref(), Some("lock-17"));
	}
}

// vim: ts=4
