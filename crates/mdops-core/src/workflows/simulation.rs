use super::error::WorkflowError;
use crate::core::loggable::{DeclarationError, Loggable, TypeScope};
use crate::core::namespace::Namespace;
use crate::engine::EngineRef;
use crate::operations::Operations;
use tracing::debug;

/// A loaded engine together with the operations scheduled on it.
pub struct Simulation {
    engine: EngineRef,
    operations: Operations,
}

impl Simulation {
    pub fn new(engine: EngineRef) -> Self {
        Self::with_operations(engine, Operations::new())
    }

    pub fn with_operations(engine: EngineRef, operations: Operations) -> Self {
        Self {
            operations: operations.with_engine(engine.clone()),
            engine,
        }
    }

    pub fn engine(&self) -> &EngineRef {
        &self.engine
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut Operations {
        &mut self.operations
    }

    /// The engine's current step, or zero before a state is loaded.
    pub fn timestep(&self) -> u64 {
        self.engine
            .try_borrow()
            .map(|engine| engine.timestep())
            .unwrap_or(0)
    }

    /// Advances one step, scheduling the operations first if needed.
    pub fn step(&mut self) -> Result<u64, WorkflowError> {
        if !self.operations.is_scheduled() {
            self.operations.schedule()?;
        }
        let step = self
            .engine
            .try_borrow_mut()
            .map_err(|_| WorkflowError::Busy)?
            .step()?;
        debug!(step, "Advanced simulation.");
        Ok(step)
    }
}

impl Loggable for Simulation {
    fn namespace() -> Namespace {
        Namespace::from(["mdops", "Simulation"])
    }

    fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
        scope
            .scalar("timestep", |sim| sim.timestep().into())?
            .scalar("operation_count", |sim| sim.operations.len().into())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::shared;
    use crate::engine::reference::ReferenceEngine;
    use crate::operations::OperationsError;
    use crate::operations::builtin::Integrator;

    #[test]
    fn stepping_schedules_operations_on_first_use() {
        let engine: EngineRef = shared(ReferenceEngine::with_state(5));
        let mut simulation = Simulation::new(engine);
        simulation
            .operations_mut()
            .add(shared(Integrator::new(0.005)))
            .unwrap();

        assert_eq!(simulation.step(), Ok(6));
        assert!(simulation.operations().is_scheduled());
        assert_eq!(simulation.timestep(), 6);
    }

    #[test]
    fn stepping_without_state_fails() {
        let engine: EngineRef = shared(ReferenceEngine::new());
        let mut simulation = Simulation::new(engine);

        assert_eq!(
            simulation.step(),
            Err(WorkflowError::Operations {
                source: OperationsError::NotInitialized
            })
        );
    }
}
