use super::operation::{Lifecycle, Operation};
use crate::core::loggable::{DeclarationError, Loggable, TypeScope};
use crate::core::quantity::{LogFlag, LogValue};
use crate::engine::{Capability, Trigger};

const DEFAULT_SORTER_PERIOD: u64 = 200;

/// Advances the system in time. The engine owns the actual equations of
/// motion; this side only carries the parameters it is configured with.
#[derive(Debug, Clone)]
pub struct Integrator {
    name: String,
    dt: f64,
    lifecycle: Lifecycle,
}

impl Integrator {
    pub fn new(dt: f64) -> Self {
        Self::named("integrator", dt)
    }

    pub fn named(name: impl Into<String>, dt: f64) -> Self {
        Self {
            name: name.into(),
            dt,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }
}

impl Operation for Integrator {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Integrator
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl Loggable for Integrator {
    fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
        scope
            .scalar("dt", |i| i.dt.into())?
            .scalar("attached", |i| i.lifecycle.is_attached().into())?;
        Ok(())
    }
}

/// Reorders particles in memory for locality. Every container starts with one.
#[derive(Debug, Clone)]
pub struct ParticleSorter {
    trigger: Trigger,
    grid: Option<u32>,
    lifecycle: Lifecycle,
}

impl ParticleSorter {
    pub fn new(trigger: Trigger, grid: Option<u32>) -> Self {
        Self {
            trigger,
            grid,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn grid(&self) -> Option<u32> {
        self.grid
    }
}

impl Default for ParticleSorter {
    fn default() -> Self {
        Self::new(Trigger::periodic(DEFAULT_SORTER_PERIOD), None)
    }
}

impl Operation for ParticleSorter {
    fn name(&self) -> &str {
        "particle_sorter"
    }

    fn capability(&self) -> Capability {
        Capability::Tuner
    }

    fn trigger(&self) -> Option<Trigger> {
        Some(self.trigger)
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl Loggable for ParticleSorter {
    fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
        scope
            .quantity("trigger", LogFlag::String, |s| s.trigger.to_string().into())?
            .scalar("grid", |s| {
                s.grid
                    .map(LogValue::from)
                    .unwrap_or(LogValue::Int(0))
            })?;
        Ok(())
    }
}

/// A named tuner, updater or analyzer that runs on a trigger.
///
/// The work itself happens engine-side; this type is the user-facing handle
/// used to schedule it and to log its settings.
#[derive(Debug, Clone)]
pub struct TriggeredOperation {
    name: String,
    capability: Capability,
    trigger: Trigger,
    lifecycle: Lifecycle,
}

impl TriggeredOperation {
    fn with_capability(name: impl Into<String>, capability: Capability, trigger: Trigger) -> Self {
        Self {
            name: name.into(),
            capability,
            trigger,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn analyzer(name: impl Into<String>, trigger: Trigger) -> Self {
        Self::with_capability(name, Capability::Analyzer, trigger)
    }

    pub fn updater(name: impl Into<String>, trigger: Trigger) -> Self {
        Self::with_capability(name, Capability::Updater, trigger)
    }

    pub fn tuner(name: impl Into<String>, trigger: Trigger) -> Self {
        Self::with_capability(name, Capability::Tuner, trigger)
    }

    pub fn set_trigger(&mut self, trigger: Trigger) {
        self.trigger = trigger;
    }
}

impl Operation for TriggeredOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn trigger(&self) -> Option<Trigger> {
        Some(self.trigger)
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl Loggable for TriggeredOperation {
    fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
        scope
            .quantity("name", LogFlag::String, |op| op.name.as_str().into())?
            .quantity("trigger", LogFlag::String, |op| op.trigger.to_string().into())?
            .scalar("period", |op| {
                op.trigger
                    .period()
                    .map(LogValue::from)
                    .unwrap_or(LogValue::Int(0))
            })?
            .scalar("attached", |op| op.lifecycle.is_attached().into())?;
        Ok(())
    }
}
