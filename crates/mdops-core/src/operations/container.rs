use super::builtin::ParticleSorter;
use super::error::OperationsError;
use super::operation::{self, OpRef, same_op};
use super::synced::{SyncedList, handle_conversion, triggered_conversion};
use crate::core::shared::shared;
use crate::engine::{Capability, CollectionKind, EngineRef};
use std::ops::{AddAssign, SubAssign};
use tracing::{error, info, warn};

/// The integrator plus the tuners, updaters and analyzers of one simulation.
///
/// Scheduling attaches every member to the engine; while scheduled, later
/// additions and removals attach or detach immediately.
pub struct Operations {
    engine: Option<EngineRef>,
    scheduled: bool,
    integrator: Option<OpRef>,
    tuners: SyncedList,
    updaters: SyncedList,
    analyzers: SyncedList,
}

impl Default for Operations {
    fn default() -> Self {
        Self::new()
    }
}

impl Operations {
    /// A container holding the default particle sorter.
    pub fn new() -> Self {
        let mut operations = Self::empty();
        let sorter: OpRef = shared(ParticleSorter::default());
        if let Err(error) = operations.tuners.push(sorter) {
            warn!(%error, "Could not install the default particle sorter.");
        }
        operations
    }

    pub fn empty() -> Self {
        Self {
            engine: None,
            scheduled: false,
            integrator: None,
            tuners: SyncedList::new(Capability::Tuner, CollectionKind::Tuners, handle_conversion),
            updaters: SyncedList::new(
                Capability::Updater,
                CollectionKind::Updaters,
                triggered_conversion,
            ),
            analyzers: SyncedList::new(
                Capability::Analyzer,
                CollectionKind::Analyzers,
                triggered_conversion,
            ),
        }
    }

    pub fn with_engine(mut self, engine: EngineRef) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn set_engine(&mut self, engine: Option<EngineRef>) {
        self.engine = engine;
    }

    fn is_initialized(&self) -> bool {
        self.engine.as_ref().is_some_and(|engine| {
            engine
                .try_borrow()
                .map(|engine| engine.has_state())
                .unwrap_or(false)
        })
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn integrator(&self) -> Option<&OpRef> {
        self.integrator.as_ref()
    }

    pub fn tuners(&self) -> &SyncedList {
        &self.tuners
    }

    pub fn updaters(&self) -> &SyncedList {
        &self.updaters
    }

    pub fn analyzers(&self) -> &SyncedList {
        &self.analyzers
    }

    pub fn add(&mut self, op: OpRef) -> Result<(), OperationsError> {
        let (name, capability, added) = operation::describe(&op)?;
        if added {
            return Err(OperationsError::DoubleAdd { name });
        }
        match capability {
            Capability::Integrator => self.set_integrator(Some(op)).map(|_| ()),
            Capability::Tuner => self.tuners.push(op),
            Capability::Updater => self.updaters.push(op),
            Capability::Analyzer => self.analyzers.push(op),
        }
    }

    /// Installs `op` as the integrator and returns the previous one, which is
    /// detached and released so it may be added elsewhere.
    pub fn set_integrator(&mut self, op: Option<OpRef>) -> Result<Option<OpRef>, OperationsError> {
        if let Some(new) = &op {
            let (name, capability, added) = operation::describe(new)?;
            if added {
                return Err(OperationsError::DoubleAdd { name });
            }
            if capability != Capability::Integrator {
                return Err(OperationsError::TypeMismatch {
                    name,
                    expected: Capability::Integrator,
                    found: capability,
                });
            }
            if self.scheduled {
                let engine = self.engine.as_ref().ok_or(OperationsError::NotInitialized)?;
                operation::attach(new, engine)?;
            }
            operation::borrow_mut(new)?.lifecycle_mut().mark_added();
        }

        let old = std::mem::replace(&mut self.integrator, op);
        if self.scheduled {
            let handle = match &self.integrator {
                Some(new) => operation::borrow(new)?.lifecycle().handle(),
                None => None,
            };
            if let Some(engine) = &self.engine {
                engine
                    .try_borrow_mut()
                    .map_err(|_| OperationsError::Busy)?
                    .set_integrator(handle)?;
            }
        }

        if let Some(old) = &old {
            operation::borrow_mut(old)?.notify_disconnect();
            operation::detach(old, self.engine.as_ref())?;
            operation::borrow_mut(old)?.lifecycle_mut().release();
            info!(name = operation::borrow(old)?.name(), "Replaced integrator.");
        }
        Ok(old)
    }

    pub fn schedule(&mut self) -> Result<(), OperationsError> {
        if !self.is_initialized() {
            return Err(OperationsError::NotInitialized);
        }
        let engine = self.engine.clone().ok_or(OperationsError::NotInitialized)?;

        if let Some(integrator) = &self.integrator {
            let attached = operation::borrow(integrator)?.lifecycle().is_attached();
            if !attached {
                let handle = operation::attach(integrator, &engine)?;
                engine
                    .try_borrow_mut()
                    .map_err(|_| OperationsError::Busy)?
                    .set_integrator(Some(handle))?;
            }
        }
        for list in [&mut self.updaters, &mut self.analyzers, &mut self.tuners] {
            if !list.is_synced() {
                list.sync(&engine)?;
            }
        }
        self.scheduled = true;
        info!(operations = self.len(), "Scheduled operations.");
        Ok(())
    }

    /// Detaches everything from the engine. Without an integrator only the
    /// auxiliary collections are desynchronized.
    pub fn unschedule(&mut self) -> Result<(), OperationsError> {
        if let Some(integrator) = &self.integrator {
            operation::detach(integrator, self.engine.as_ref())?;
            if let Some(engine) = &self.engine {
                engine
                    .try_borrow_mut()
                    .map_err(|_| OperationsError::Busy)?
                    .set_integrator(None)?;
            }
        }
        self.analyzers.unsync()?;
        self.updaters.unsync()?;
        self.tuners.unsync()?;
        self.scheduled = false;
        info!("Unscheduled operations.");
        Ok(())
    }

    /// The integrator first, then analyzers, updaters and tuners.
    pub fn iter(&self) -> impl Iterator<Item = &OpRef> {
        self.integrator
            .iter()
            .chain(self.analyzers.iter())
            .chain(self.updaters.iter())
            .chain(self.tuners.iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, op: &OpRef) -> bool {
        self.iter().any(|member| same_op(member, op))
    }

    /// Removes a tuner, updater or analyzer. The integrator can only be
    /// replaced through [`Operations::set_integrator`].
    pub fn remove(&mut self, op: &OpRef) -> Result<OpRef, OperationsError> {
        let (name, capability, _) = operation::describe(op)?;
        match capability {
            Capability::Integrator => Err(OperationsError::RemoveIntegrator { name }),
            Capability::Analyzer => self.analyzers.remove(op),
            Capability::Updater => self.updaters.remove(op),
            Capability::Tuner => self.tuners.remove(op),
        }
    }
}

impl AddAssign<OpRef> for Operations {
    fn add_assign(&mut self, op: OpRef) {
        if let Err(error) = self.add(op) {
            error!(%error, "Failed to add operation.");
        }
    }
}

impl SubAssign<&OpRef> for Operations {
    fn sub_assign(&mut self, op: &OpRef) {
        if let Err(error) = self.remove(op) {
            error!(%error, "Failed to remove operation.");
        }
    }
}
