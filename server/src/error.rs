//! Error handling subsystem. Implements a custom Error type.

use crate::prelude::*;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	// Core errors
	NotFound,
	PermissionDenied, // 403 - role denies the operation
	Unauthorized,     // 401 - missing/invalid caller identity
	DbError,
	Parse,

	// Input validation and constraints
	ValidationError(String), // 400 - malformed or inconsistent input
	Conflict(String),        // 409 - constraint violation (unique, state machine, etc)

	// Token verification
	BadSignature,
	BadAudience,
	BadIssuer,
	Expired,

	// Device selection and offline fallback
	UnknownDevice,      // 404 - device hint matches no usable device row
	NoRegisteredDevice, // 409 - no usable device at all, re-enrollment required
	StaleFallback,      // fallback token outside the freshness window

	// System and delivery
	SigningUnavailable(String),
	DeliveryFailed(String),
	Timeout,
	ServiceUnavailable(String),
	ConfigError(String),
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{:?}", self)
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		warn!("io error: {}", err);
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(_err: serde_json::Error) -> Self {
		warn!("json error: {}", _err);
		Error::Parse
	}
}

impl From<std::time::SystemTimeError> for Error {
	fn from(_err: std::time::SystemTimeError) -> Self {
		warn!("system time error: {}", _err);
		Error::ServiceUnavailable("system time error".into())
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(_err: tokio::task::JoinError) -> Self {
		warn!("tokio join error: {}", _err);
		Error::ServiceUnavailable("task execution failed".into())
	}
}

impl From<jsonwebtoken::errors::Error> for Error {
	fn from(err: jsonwebtoken::errors::Error) -> Self {
		use jsonwebtoken::errors::ErrorKind;

		warn!("jwt error: {}", err);
		match err.kind() {
			ErrorKind::ExpiredSignature => Error::Expired,
			ErrorKind::InvalidAudience => Error::BadAudience,
			ErrorKind::InvalidIssuer => Error::BadIssuer,
			ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => Error::Parse,
			_ => Error::BadSignature,
		}
	}
}

// vim: ts=4
