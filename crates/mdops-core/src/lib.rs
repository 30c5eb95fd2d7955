//! # mdops Core Library
//!
//! Quantity logging and operation scheduling for particle simulations driven
//! by an external engine.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict layering so each piece can be tested without
//! the ones above it.
//!
//! - **[`core`]: The Foundation.** Namespaces, quantity descriptors, the
//!   declaration mechanism through which types export loggable quantities,
//!   and the `Logger` that binds live objects and produces snapshots.
//!
//! - **[`engine`]: The Boundary.** The `Engine` trait that a compiled
//!   simulation engine implements, native handles and triggers, and an
//!   in-process reference engine.
//!
//! - **[`operations`]: The Scheduler.** The integrator and the tuner,
//!   updater and analyzer lists, with their add/attach lifecycle and
//!   synchronization into the engine.
//!
//! - **[`workflows`]: The Public API.** Runs a scheduled simulation for a
//!   number of steps and collects log snapshots with progress reporting.

pub mod core;
pub mod engine;
pub mod operations;
pub mod workflows;
