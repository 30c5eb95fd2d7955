//! # Workflows Module
//!
//! High-level entry points that drive a scheduled simulation and collect log
//! snapshots along the way.
//!
//! ## Overview
//!
//! A workflow takes a [`simulation::Simulation`] and a
//! [`Logger`](crate::core::logger::Logger) that already holds the quantities
//! of interest, schedules the operations if needed, advances the engine and
//! materializes the logger every `log_period` steps and once at the end.
//!
//! ## Architecture
//!
//! - **Run Workflow** ([`run`]) - Stepping loop with periodic and final snapshots
//! - **Simulation** ([`simulation`]) - Engine plus operations, itself loggable
//! - **Configuration** ([`config`]) - Builder for run parameters
//! - **Progress** ([`progress`]) - Callback-based progress events
//! - **Errors** ([`error`]) - Failures surfaced by any layer during a run

pub mod config;
pub mod error;
pub mod progress;
pub mod run;
pub mod simulation;
