//! # Operations Module
//!
//! Membership and scheduling of the per-step work around the integrator.
//!
//! ## Overview
//!
//! An [`Operations`] container owns at most one integrator and ordered lists
//! of tuners, updaters and analyzers. Each operation moves through a small
//! lifecycle: added to exactly one container, then attached to the engine
//! while scheduled. Scheduling mirrors every list into the engine's native
//! collections and keeps them in step with later additions and removals.
//!
//! ## Architecture
//!
//! - **Operation trait** ([`operation`]) - Identity, capability and attach/detach lifecycle
//! - **Synchronized lists** ([`synced`]) - Capability-checked lists mirrored into the engine
//! - **Container** ([`container`]) - The integrator slot plus the three lists
//! - **Built-in operations** ([`builtin`]) - Integrator, particle sorter and triggered operations
//! - **Errors** ([`error`]) - Membership and scheduling failures

pub mod builtin;
pub mod container;
pub mod error;
pub mod operation;
pub mod synced;

pub use container::Operations;
pub use error::OperationsError;
pub use operation::{Lifecycle, OpRef, Operation};
