//! Route pass orchestrator.
//!
//! End-to-end issuance: device selection, audience and schedule resolution,
//! signing, and the best-effort issuance audit record. The audit row is the
//! last side effect before the token is returned, and its failure never
//! fails the request.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::denylist_adapter::RoutePassIssuance;
use crate::directory_adapter::UserDevice;
use crate::pass::schedule::ScheduleClaim;
use crate::pass::{audience, schedule};
use crate::prelude::*;
use crate::types::Role;

/// Authenticated caller context, as established by the HTTP surface
#[derive(Clone, Debug)]
pub struct AuthCtx {
	pub user_id: Box<str>,
	pub role: Role,
	pub facility_ids: Option<Vec<Box<str>>>,
}

#[skip_serializing_none]
#[derive(Serialize)]
struct RoutePassBody<'a> {
	sub: &'a str,
	device_pubkey: &'a str,
	aud: &'a [Box<str>],
	schedule: Option<&'a ScheduleClaim>,
}

/// Claims of an issued route pass, as seen by a verifier
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize)]
pub struct RoutePassClaims {
	pub sub: Box<str>,
	pub device_pubkey: Box<str>,
	pub aud: Vec<Box<str>>,
	pub schedule: Option<ScheduleClaim>,
	pub iat: i64,
	pub exp: i64,
	pub jti: Box<str>,
	pub iss: Box<str>,
}

/// Issues a route pass for the authenticated user.
///
/// With a device hint, the hint must name a usable device of the user
/// (`UnknownDevice` otherwise); without one, the most recently updated
/// usable device is taken (`NoRegisteredDevice` when there is none).
pub async fn issue_for_user(
	app: &App,
	ctx: &AuthCtx,
	app_device_id: Option<&str>,
) -> ClResult<Box<str>> {
	let device = select_device(app, &ctx.user_id, app_device_id).await?;

	let audiences = audience::resolve(
		app.directory_adapter.as_ref(),
		&ctx.user_id,
		ctx.role,
		ctx.facility_ids.as_deref(),
	)
	.await?;

	issue(app, ctx, &device, audiences).await
}

/// Issues a route pass with a caller-fixed audience set.
///
/// Used by the offline fallback path, which always issues with an empty
/// audience list: the pass is a bootstrap credential, not a scope grant.
pub(crate) async fn issue_with_audiences(
	app: &App,
	ctx: &AuthCtx,
	device: &UserDevice,
	audiences: Vec<Box<str>>,
) -> ClResult<Box<str>> {
	issue(app, ctx, device, audiences).await
}

async fn select_device(
	app: &App,
	user_id: &str,
	app_device_id: Option<&str>,
) -> ClResult<UserDevice> {
	match app_device_id {
		Some(hint) => {
			app.directory_adapter.read_device(user_id, hint).await.map_err(|err| match err {
				Error::NotFound => Error::UnknownDevice,
				other => other,
			})
		}
		None => {
			app.directory_adapter.read_latest_device(user_id).await.map_err(|err| match err {
				Error::NotFound => Error::NoRegisteredDevice,
				other => other,
			})
		}
	}
}

async fn issue(
	app: &App,
	ctx: &AuthCtx,
	device: &UserDevice,
	audiences: Vec<Box<str>>,
) -> ClResult<Box<str>> {
	let Some(device_pubkey) = device.public_key.as_deref().filter(|k| !k.is_empty()) else {
		// enrolled but never attested a key: the app must re-enroll
		return Err(Error::NoRegisteredDevice);
	};

	let schedule = schedule::resolve(
		app.directory_adapter.as_ref(),
		&ctx.user_id,
		ctx.facility_ids.as_deref(),
		&audiences,
	)
	.await?;

	let body = RoutePassBody {
		sub: &ctx.user_id,
		device_pubkey,
		aud: &audiences,
		schedule: schedule.as_ref(),
	};
	let signed = app.signer.sign(&body, app.config.route_pass_ttl_seconds())?;

	debug!(
		"issued route pass for {} on device {} with {} audiences",
		ctx.user_id,
		device.id,
		audiences.len()
	);

	// Audit record is best-effort: issuance must not fail because of it.
	let issuance = RoutePassIssuance {
		jti: signed.jti.clone(),
		user_id: ctx.user_id.clone(),
		device_id: device.id.clone(),
		audiences,
		issued_at: signed.iat,
		expires_at: signed.exp,
	};
	if let Err(err) = app.denylist_adapter.create_issuance(&issuance).await {
		warn!("route pass issuance audit write failed for jti {}: {}", signed.jti, err);
	}

	Ok(signed.token)
}

// vim: ts=4
