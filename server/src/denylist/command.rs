//! Denylist command builder.
//!
//! Assembles and signs the `DENYLIST_ADD` / `DENYLIST_REMOVE` envelopes the
//! gateway relays to locks. The envelope shares the route pass header and
//! signing; `cmd_type` is the discriminator. `exp` on each add entry is the
//! lock-side removal deadline, independent of the envelope's own validity.

use serde::{Deserialize, Serialize};

use crate::auth::signer::Signer;
use crate::prelude::*;

pub const CMD_DENYLIST_ADD: &str = "DENYLIST_ADD";
pub const CMD_DENYLIST_REMOVE: &str = "DENYLIST_REMOVE";

/// Validity of the command envelope itself
const COMMAND_TTL_SECONDS: i64 = 300;

/// One denied subject with its lock-side removal deadline
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DenylistEntryClaim {
	pub sub: Box<str>,
	pub exp: i64,
}

#[derive(Serialize)]
struct DenylistAddBody<'a> {
	cmd_type: &'static str,
	targets: &'a [Box<str>],
	entries: &'a [DenylistEntryClaim],
}

#[derive(Serialize)]
struct DenylistRemoveBody<'a> {
	cmd_type: &'static str,
	targets: &'a [Box<str>],
	subjects: &'a [Box<str>],
}

/// Claims of a `DENYLIST_ADD` command, for the verifying side
#[derive(Debug, Deserialize)]
pub struct DenylistAddClaims {
	pub cmd_type: Box<str>,
	pub targets: Vec<Box<str>>,
	pub entries: Vec<DenylistEntryClaim>,
	pub iat: i64,
	pub exp: i64,
	pub jti: Box<str>,
	pub iss: Box<str>,
}

/// Claims of a `DENYLIST_REMOVE` command, for the verifying side
#[derive(Debug, Deserialize)]
pub struct DenylistRemoveClaims {
	pub cmd_type: Box<str>,
	pub targets: Vec<Box<str>>,
	pub subjects: Vec<Box<str>>,
	pub iat: i64,
	pub exp: i64,
	pub jti: Box<str>,
	pub iss: Box<str>,
}

pub fn build_add(
	signer: &Signer,
	targets: &[Box<str>],
	entries: &[DenylistEntryClaim],
) -> ClResult<Box<str>> {
	let body = DenylistAddBody { cmd_type: CMD_DENYLIST_ADD, targets, entries };
	Ok(signer.sign(&body, COMMAND_TTL_SECONDS)?.token)
}

pub fn build_remove(
	signer: &Signer,
	targets: &[Box<str>],
	subjects: &[Box<str>],
) -> ClResult<Box<str>> {
	let body = DenylistRemoveBody { cmd_type: CMD_DENYLIST_REMOVE, targets, subjects };
	Ok(signer.sign(&body, COMMAND_TTL_SECONDS)?.token)
}


// vim: ts=4
