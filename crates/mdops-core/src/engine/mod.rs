//! # Engine Module
//!
//! The boundary to the compiled simulation engine that owns particle data,
//! force evaluation and stepping.
//!
//! ## Overview
//!
//! Nothing in this crate computes physics. Operations are mirrored into the
//! engine as opaque [`NativeHandle`]s, and the engine keeps three ordered
//! native collections (updaters, analyzers, tuners) plus an integrator slot
//! that the [`Operations`](crate::operations::Operations) container keeps in
//! sync with its own membership.
//!
//! - **Handles** ([`ids`]) - Keys of live engine-side objects
//! - **Triggers** ([`trigger`]) - Step schedules carried into native collections
//! - **Reference engine** ([`reference`]) - An in-process engine that records every call
//! - **Errors** ([`error`]) - Failures reported by the engine

pub mod error;
pub mod ids;
pub mod reference;
pub mod trigger;

pub use error::EngineError;
pub use ids::NativeHandle;
pub use trigger::Trigger;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The role an operation plays around the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Integrator,
    Tuner,
    Updater,
    Analyzer,
}

impl Capability {
    /// The native collection that holds operations of this kind.
    pub fn collection(&self) -> Option<CollectionKind> {
        match self {
            Capability::Integrator => None,
            Capability::Tuner => Some(CollectionKind::Tuners),
            Capability::Updater => Some(CollectionKind::Updaters),
            Capability::Analyzer => Some(CollectionKind::Analyzers),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Integrator => "integrator",
            Capability::Tuner => "tuner",
            Capability::Updater => "updater",
            Capability::Analyzer => "analyzer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Updaters,
    Analyzers,
    Tuners,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Updaters => "updaters",
            CollectionKind::Analyzers => "analyzers",
            CollectionKind::Tuners => "tuners",
        };
        f.write_str(name)
    }
}

/// What the engine needs to know to create the native side of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub capability: Capability,
}

/// One slot of a native collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEntry {
    pub handle: NativeHandle,
    pub trigger: Option<Trigger>,
}

pub trait Engine {
    /// Whether a simulation state (particles, box, timestep) is loaded.
    fn has_state(&self) -> bool;

    fn timestep(&self) -> u64;

    fn create(&mut self, spec: &OperationSpec) -> Result<NativeHandle, EngineError>;

    fn destroy(&mut self, handle: NativeHandle) -> Result<(), EngineError>;

    fn set_integrator(&mut self, handle: Option<NativeHandle>) -> Result<(), EngineError>;

    fn insert(
        &mut self,
        kind: CollectionKind,
        index: usize,
        entry: NativeEntry,
    ) -> Result<(), EngineError>;

    fn remove(&mut self, kind: CollectionKind, index: usize) -> Result<NativeEntry, EngineError>;

    fn clear(&mut self, kind: CollectionKind);

    /// Advances one timestep and returns the new step number.
    fn step(&mut self) -> Result<u64, EngineError>;
}

pub type EngineRef = Rc<RefCell<dyn Engine>>;
