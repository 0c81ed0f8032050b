//! Route pass issuance subsystem: audience and schedule resolution, the
//! issuance orchestrator, and the offline fallback path.

pub mod audience;
pub mod fallback;
pub mod issuer;
pub mod schedule;

// vim: ts=4
