use super::{
    CollectionKind, Engine, EngineError, NativeEntry, NativeHandle, OperationSpec,
};
use slotmap::SlotMap;
use tracing::{debug, trace};

/// Bookkeeping for one live engine-side object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeObject {
    pub spec: OperationSpec,
    pub executions: u64,
}

/// An in-process engine that performs no physics.
///
/// It keeps the same native collections a compiled engine would and counts
/// how often each live object ran, which makes scheduling observable.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    timestep: Option<u64>,
    objects: SlotMap<NativeHandle, NativeObject>,
    integrator: Option<NativeHandle>,
    updaters: Vec<NativeEntry>,
    analyzers: Vec<NativeEntry>,
    tuners: Vec<NativeEntry>,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(timestep: u64) -> Self {
        Self {
            timestep: Some(timestep),
            ..Self::default()
        }
    }

    pub fn load_state(&mut self, timestep: u64) {
        debug!(timestep, "Loaded simulation state.");
        self.timestep = Some(timestep);
    }

    pub fn object(&self, handle: NativeHandle) -> Option<&NativeObject> {
        self.objects.get(handle)
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn integrator(&self) -> Option<NativeHandle> {
        self.integrator
    }

    pub fn collection(&self, kind: CollectionKind) -> &[NativeEntry] {
        match kind {
            CollectionKind::Updaters => &self.updaters,
            CollectionKind::Analyzers => &self.analyzers,
            CollectionKind::Tuners => &self.tuners,
        }
    }

    fn collection_mut(&mut self, kind: CollectionKind) -> &mut Vec<NativeEntry> {
        match kind {
            CollectionKind::Updaters => &mut self.updaters,
            CollectionKind::Analyzers => &mut self.analyzers,
            CollectionKind::Tuners => &mut self.tuners,
        }
    }

    fn run_collection(&mut self, kind: CollectionKind, step: u64) {
        let entries = match kind {
            CollectionKind::Updaters => &self.updaters,
            CollectionKind::Analyzers => &self.analyzers,
            CollectionKind::Tuners => &self.tuners,
        };
        for entry in entries {
            let fires = entry.trigger.is_none_or(|trigger| trigger.compute(step));
            if fires {
                if let Some(object) = self.objects.get_mut(entry.handle) {
                    object.executions += 1;
                    trace!(name = %object.spec.name, step, "Executed native object.");
                }
            }
        }
    }
}

impl Engine for ReferenceEngine {
    fn has_state(&self) -> bool {
        self.timestep.is_some()
    }

    fn timestep(&self) -> u64 {
        self.timestep.unwrap_or(0)
    }

    fn create(&mut self, spec: &OperationSpec) -> Result<NativeHandle, EngineError> {
        if self.timestep.is_none() {
            return Err(EngineError::NoState);
        }
        let handle = self.objects.insert(NativeObject {
            spec: spec.clone(),
            executions: 0,
        });
        debug!(name = %spec.name, capability = %spec.capability, "Created native object.");
        Ok(handle)
    }

    fn destroy(&mut self, handle: NativeHandle) -> Result<(), EngineError> {
        let object = self
            .objects
            .remove(handle)
            .ok_or(EngineError::StaleHandle(handle))?;
        if self.integrator == Some(handle) {
            self.integrator = None;
        }
        debug!(name = %object.spec.name, "Destroyed native object.");
        Ok(())
    }

    fn set_integrator(&mut self, handle: Option<NativeHandle>) -> Result<(), EngineError> {
        if let Some(handle) = handle {
            if !self.objects.contains_key(handle) {
                return Err(EngineError::StaleHandle(handle));
            }
        }
        self.integrator = handle;
        Ok(())
    }

    fn insert(
        &mut self,
        kind: CollectionKind,
        index: usize,
        entry: NativeEntry,
    ) -> Result<(), EngineError> {
        if !self.objects.contains_key(entry.handle) {
            return Err(EngineError::StaleHandle(entry.handle));
        }
        let collection = self.collection_mut(kind);
        if index > collection.len() {
            return Err(EngineError::IndexOutOfRange {
                kind,
                index,
                len: collection.len(),
            });
        }
        collection.insert(index, entry);
        Ok(())
    }

    fn remove(&mut self, kind: CollectionKind, index: usize) -> Result<NativeEntry, EngineError> {
        let collection = self.collection_mut(kind);
        if index >= collection.len() {
            return Err(EngineError::IndexOutOfRange {
                kind,
                index,
                len: collection.len(),
            });
        }
        Ok(collection.remove(index))
    }

    fn clear(&mut self, kind: CollectionKind) {
        self.collection_mut(kind).clear();
    }

    fn step(&mut self) -> Result<u64, EngineError> {
        let step = self.timestep.ok_or(EngineError::NoState)? + 1;
        self.timestep = Some(step);

        self.run_collection(CollectionKind::Tuners, step);
        self.run_collection(CollectionKind::Updaters, step);
        if let Some(object) = self
            .integrator
            .and_then(|handle| self.objects.get_mut(handle))
        {
            object.executions += 1;
        }
        self.run_collection(CollectionKind::Analyzers, step);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Capability, Trigger};

    fn spec(name: &str, capability: Capability) -> OperationSpec {
        OperationSpec {
            name: name.to_string(),
            capability,
        }
    }

    #[test]
    fn objects_cannot_be_created_before_state_is_loaded() {
        let mut engine = ReferenceEngine::new();

        assert_eq!(
            engine.create(&spec("nve", Capability::Integrator)),
            Err(EngineError::NoState)
        );

        engine.load_state(0);
        assert!(engine.create(&spec("nve", Capability::Integrator)).is_ok());
        assert_eq!(engine.live_objects(), 1);
    }

    #[test]
    fn stepping_runs_triggered_entries() {
        let mut engine = ReferenceEngine::with_state(0);
        let integrator = engine.create(&spec("nve", Capability::Integrator)).unwrap();
        let analyzer = engine.create(&spec("thermo", Capability::Analyzer)).unwrap();
        engine.set_integrator(Some(integrator)).unwrap();
        engine
            .insert(
                CollectionKind::Analyzers,
                0,
                NativeEntry {
                    handle: analyzer,
                    trigger: Some(Trigger::periodic(5)),
                },
            )
            .unwrap();

        for _ in 0..20 {
            engine.step().unwrap();
        }

        assert_eq!(engine.timestep(), 20);
        assert_eq!(engine.object(integrator).unwrap().executions, 20);
        assert_eq!(engine.object(analyzer).unwrap().executions, 4);
    }

    #[test]
    fn destroying_the_integrator_clears_its_slot() {
        let mut engine = ReferenceEngine::with_state(0);
        let integrator = engine.create(&spec("nve", Capability::Integrator)).unwrap();
        engine.set_integrator(Some(integrator)).unwrap();

        engine.destroy(integrator).unwrap();

        assert_eq!(engine.integrator(), None);
        assert_eq!(
            engine.destroy(integrator),
            Err(EngineError::StaleHandle(integrator))
        );
    }

    #[test]
    fn collection_indices_are_bounds_checked() {
        let mut engine = ReferenceEngine::with_state(0);
        let tuner = engine.create(&spec("sorter", Capability::Tuner)).unwrap();
        let entry = NativeEntry {
            handle: tuner,
            trigger: None,
        };

        assert!(matches!(
            engine.insert(CollectionKind::Tuners, 1, entry),
            Err(EngineError::IndexOutOfRange { .. })
        ));
        engine.insert(CollectionKind::Tuners, 0, entry).unwrap();
        assert_eq!(engine.remove(CollectionKind::Tuners, 0), Ok(entry));
        assert!(engine.collection(CollectionKind::Tuners).is_empty());
    }
}
