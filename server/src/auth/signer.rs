//! Operator signing service.
//!
//! Holds the Ed25519 operator keypair loaded at startup and produces the
//! compact signed tokens every other subsystem rides on: route passes,
//! denylist commands and secure-time packets. Device-signed tokens are
//! verified with a caller-supplied public key; there is no dynamic key
//! rotation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::prelude::*;

/// Issuer claim of every cloud-signed token
pub const ISSUER: &str = "blulok-cloud";

/// base64url length of a 32-byte Ed25519 key
const KEY_B64_LEN: usize = 43;

/// A compact token together with the standard claims stamped into it
#[derive(Clone, Debug)]
pub struct SignedToken {
	pub token: Box<str>,
	pub jti: Box<str>,
	pub iat: Timestamp,
	pub exp: Timestamp,
}

#[derive(Serialize)]
struct Claims<'a, T: Serialize> {
	#[serde(flatten)]
	body: &'a T,
	iat: i64,
	exp: i64,
	jti: &'a str,
	iss: &'a str,
}

/// Decodes base64url Ed25519 key material, enforcing the 43-char / 32-byte shape
pub fn decode_key_b64(b64: &str) -> ClResult<[u8; 32]> {
	if b64.len() != KEY_B64_LEN {
		return Err(Error::ValidationError(format!(
			"Ed25519 key must be {} base64url chars, got {}",
			KEY_B64_LEN,
			b64.len()
		)));
	}
	let bytes = URL_SAFE_NO_PAD
		.decode(b64)
		.map_err(|_| Error::ValidationError("Ed25519 key is not valid base64url".into()))?;
	bytes
		.try_into()
		.map_err(|_| Error::ValidationError("Ed25519 key must decode to 32 bytes".into()))
}

/// The operator signing service
pub struct Signer {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
}

impl std::fmt::Debug for Signer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Signer").finish_non_exhaustive()
	}
}

impl Signer {
	/// Loads the operator keypair from base64url key material.
	///
	/// Fails fast on malformed keys and on a public key that does not match
	/// the private one; production startup aborts on any of these.
	pub fn new(private_key_b64: &str, public_key_b64: &str) -> ClResult<Self> {
		let seed = decode_key_b64(private_key_b64)
			.map_err(|e| Error::ConfigError(format!("operator private key: {}", e)))?;
		let public = decode_key_b64(public_key_b64)
			.map_err(|e| Error::ConfigError(format!("operator public key: {}", e)))?;

		let signing_key = SigningKey::from_bytes(&seed);
		let verifying_key = signing_key.verifying_key();
		if verifying_key.to_bytes() != public {
			return Err(Error::ConfigError(
				"operator public key does not match the private key".into(),
			));
		}

		let pkcs8 = signing_key
			.to_pkcs8_der()
			.map_err(|_| Error::ConfigError("cannot encode operator private key".into()))?;
		let encoding_key = EncodingKey::from_ed_der(pkcs8.as_bytes());

		let decoding_key = DecodingKey::from_ed_der(&verifying_key.to_bytes());

		Ok(Self { encoding_key, decoding_key })
	}

	/// Signs `body` with `iat`/`exp`/`jti`/`iss` attached, header `{alg: EdDSA, typ: JWT}`
	pub fn sign<T: Serialize>(&self, body: &T, ttl_seconds: i64) -> ClResult<SignedToken> {
		let iat = Timestamp::now();
		let exp = iat.add_seconds(ttl_seconds);
		let jti = Uuid::new_v4().to_string();

		let claims = Claims { body, iat: iat.0, exp: exp.0, jti: &jti, iss: ISSUER };
		let token = encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
			.map_err(|err| {
				error!("token signing failed: {}", err);
				Error::SigningUnavailable(err.to_string())
			})?;

		Ok(SignedToken { token: token.into(), jti: jti.into(), iat, exp })
	}

	/// Verifies an operator-signed token and returns its claims.
	///
	/// With `expected_audience` set, the token must carry that audience.
	pub fn verify<T: DeserializeOwned>(
		&self,
		token: &str,
		expected_audience: Option<&str>,
	) -> ClResult<T> {
		let mut validation = Validation::new(Algorithm::EdDSA);
		validation.set_issuer(&[ISSUER]);
		match expected_audience {
			Some(aud) => validation.set_audience(&[aud]),
			None => validation.validate_aud = false,
		}

		let data = decode::<T>(token, &self.decoding_key, &validation)?;
		Ok(data.claims)
	}
}

/// Verifies a device-signed token with the device's stored public key.
///
/// Devices sign without an `exp` claim, so expiry validation is off; the
/// caller enforces the `iat` freshness window instead.
pub fn verify_device_token<T: DeserializeOwned>(
	token: &str,
	device_public_key_b64: &str,
	issuer: &str,
	audience: &str,
) -> ClResult<T> {
	let key_bytes = decode_key_b64(device_public_key_b64)?;
	VerifyingKey::from_bytes(&key_bytes).map_err(|_| Error::BadSignature)?;
	let decoding_key = DecodingKey::from_ed_der(&key_bytes);

	let mut validation = Validation::new(Algorithm::EdDSA);
	validation.set_issuer(&[issuer]);
	validation.set_audience(&[audience]);
	validation.set_required_spec_claims(&["iss", "aud"]);
	validation.validate_exp = false;

	let data = decode::<T>(token, &decoding_key, &validation)?;
	Ok(data.claims)
}

/// Reads a compact token's payload without verifying the signature.
///
/// Only for claim routing (which key to verify with); never trust the
/// result beyond that.
pub fn peek_claims<T: DeserializeOwned>(token: &str) -> ClResult<T> {
	let mut parts = token.split('.');
	let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(_header), Some(payload), Some(_sig), None) => payload,
		_ => return Err(Error::ValidationError("malformed compact token".into())),
	};
	let bytes = URL_SAFE_NO_PAD
		.decode(payload)
		.map_err(|_| Error::ValidationError("malformed compact token payload".into()))?;
	Ok(serde_json::from_slice(&bytes)?)
}


// vim: ts=4
