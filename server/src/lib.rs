//! BluLok Cloud access-authorization core.
//!
//! Decides which users may open which smart locks, when, and distributes
//! cryptographically signed authorizations: route passes to mobile devices
//! and denylist / secure-time commands to per-facility gateways.
//!
//! Storage and the gateway link are injected through the adapter traits in
//! [`directory_adapter`], [`denylist_adapter`] and [`gateway_adapter`];
//! everything is assembled by [`AppBuilder`] into an [`App`] container with
//! an `init → serve → shutdown` lifecycle.

pub mod auth;
pub mod core;
pub mod denylist;
pub mod denylist_adapter;
pub mod directory_adapter;
pub mod error;
pub mod gateway_adapter;
pub mod pass;
pub mod prelude;
pub mod types;

pub use crate::core::app::{App, AppBuilder, AppConfig, AppState, serve, shutdown};
pub use crate::denylist::cascade::{CascadeEvent, UnassignmentOrigin};
pub use crate::pass::issuer::AuthCtx;

// vim: ts=4
