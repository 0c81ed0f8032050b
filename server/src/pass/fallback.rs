//! Offline fallback verifier.
//!
//! When a device cannot reach its facility gateway through the normal path,
//! the app signs a short-lived token with the device key and exchanges it
//! here for a route pass. The resulting pass carries no audiences: its value
//! is survivability of a network partition, not scope expansion.

use serde::Deserialize;

use crate::auth::signer;
use crate::pass::issuer::{self, AuthCtx};
use crate::prelude::*;

/// Issuer claim required on device-signed fallback tokens
pub const FALLBACK_ISSUER: &str = "blulok-app";

/// Audience claim required on device-signed fallback tokens
pub const FALLBACK_AUDIENCE: &str = "blulok-cloud-fallback";

#[derive(Deserialize)]
struct FallbackPeek {
	sub: Option<Box<str>>,
	dev: Option<Box<str>>,
}

/// Verified claims of a fallback token
#[derive(Debug, Deserialize)]
pub struct FallbackClaims {
	pub sub: Box<str>,
	pub dev: Box<str>,
	pub iat: i64,
}

/// Exchanges a device-signed fallback token for a route pass.
///
/// The token's `iat` must lie within `now ± fallback_iat_skew_seconds`;
/// anything outside that window is `StaleFallback`.
pub async fn process_fallback(app: &App, token: &str) -> ClResult<Box<str>> {
	// 1. Unverified peek: which user/device claims to have signed this?
	let peek: FallbackPeek = signer::peek_claims(token)?;
	let (Some(sub), Some(dev)) = (peek.sub, peek.dev) else {
		return Err(Error::ValidationError("fallback token missing sub or dev".into()));
	};

	// 2. The stored public key of that device decides everything else.
	let device =
		app.directory_adapter.read_device(&sub, &dev).await.map_err(|err| match err {
			Error::NotFound => Error::UnknownDevice,
			other => other,
		})?;
	let Some(public_key) = device.public_key.as_deref().filter(|k| !k.is_empty()) else {
		return Err(Error::UnknownDevice);
	};

	// 3. Verified decode with the stored key.
	let claims: FallbackClaims =
		signer::verify_device_token(token, public_key, FALLBACK_ISSUER, FALLBACK_AUDIENCE)?;

	// 4. Freshness window.
	let now = Timestamp::now().0;
	let skew = i64::from(app.config.fallback_iat_skew_seconds);
	if claims.iat < now - skew || claims.iat > now + skew {
		info!("stale fallback token for {} (iat {}, now {})", claims.sub, claims.iat, now);
		return Err(Error::StaleFallback);
	}

	// 5. Emit a route pass with deliberately empty audiences.
	let user = app.directory_adapter.read_user(&claims.sub).await?;
	if !user.active {
		return Err(Error::PermissionDenied);
	}
	let ctx = AuthCtx { user_id: claims.sub, role: user.role, facility_ids: None };
	issuer::issue_with_audiences(app, &ctx, &device, Vec::new()).await
}

// vim: ts=4
