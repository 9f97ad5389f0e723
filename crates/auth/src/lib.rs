//! Capability-based authorization primitives.
//!
//! The workflow takes the actor's capability set as an explicit input, so
//! transition logic stays a pure function of (state, event, capabilities).
//! Resolving a user's capabilities from roles/memberships is the job of the
//! surrounding authorization layer, not this crate.

pub mod actor;
pub mod capability;

pub use actor::Actor;
pub use capability::Capability;
