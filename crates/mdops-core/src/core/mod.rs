//! # Core Module
//!
//! Loggable quantity registry for simulation objects.
//!
//! ## Overview
//!
//! Simulation types declare the quantities they export once per process.
//! At runtime a [`logger::Logger`] binds live objects to those declarations
//! at collision-free namespaces and materializes a nested snapshot of their
//! current values on demand.
//!
//! ## Architecture
//!
//! - **Namespaces** ([`namespace`]) - Path type and the tree-shaped registry that refuses to overwrite live entries
//! - **Quantities** ([`quantity`]) - Quantity descriptors, log flags, values and candidate path generation
//! - **Declarations** ([`loggable`]) - The `Loggable` trait, scoped declaration stack and per-type export tables
//! - **Logging** ([`logger`]) - Binding of live objects and snapshot export
//! - **Sharing** ([`shared`]) - Shared object handles and reference identity

pub mod loggable;
pub mod logger;
pub mod namespace;
pub mod quantity;
pub mod shared;
