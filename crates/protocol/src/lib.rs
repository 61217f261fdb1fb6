//! Wire types for the video analysis service.
//!
//! This crate contains the serde-serializable types exchanged with the
//! analysis backend: the `/analyze` request and acknowledgement bodies, the
//! stream handshake, and the two inbound frame shapes. These types represent
//! the "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no behavior beyond serialization and shape discrimination
//! * 1:1 with the backend's JSON
//! * Stable: changes only when the wire protocol changes
//!
//! Field-level interpretation (score variants, defaults) lives in `vidcheck`.

pub mod analyze;
pub mod frame;

pub use analyze::*;
pub use frame::*;
