use super::error::OperationsError;
use super::operation::{self, OpRef, Operation, same_op};
use crate::engine::{Capability, CollectionKind, EngineRef, NativeEntry, NativeHandle};
use tracing::{debug, info};

/// Turns an attached operation into the entry its native collection stores.
pub type Conversion = fn(&dyn Operation, NativeHandle) -> NativeEntry;

/// Updaters and analyzers run on their own trigger.
pub fn triggered_conversion(op: &dyn Operation, handle: NativeHandle) -> NativeEntry {
    NativeEntry {
        handle,
        trigger: op.trigger(),
    }
}

/// Tuners are scheduled by the engine itself.
pub fn handle_conversion(_op: &dyn Operation, handle: NativeHandle) -> NativeEntry {
    NativeEntry {
        handle,
        trigger: None,
    }
}

/// An ordered list of operations of one capability, mirrored into a native
/// collection while synced.
///
/// Once synced, pushes and removals attach or detach the affected operation
/// and update the native collection at the same index.
pub struct SyncedList {
    capability: Capability,
    collection: CollectionKind,
    conversion: Conversion,
    items: Vec<OpRef>,
    synced: Option<EngineRef>,
}

impl SyncedList {
    pub fn new(capability: Capability, collection: CollectionKind, conversion: Conversion) -> Self {
        Self {
            capability,
            collection,
            conversion,
            items: Vec::new(),
            synced: None,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_synced(&self) -> bool {
        self.synced.is_some()
    }

    pub fn get(&self, index: usize) -> Option<&OpRef> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OpRef> {
        self.items.iter()
    }

    pub fn position(&self, op: &OpRef) -> Option<usize> {
        self.items.iter().position(|item| same_op(item, op))
    }

    pub fn contains(&self, op: &OpRef) -> bool {
        self.position(op).is_some()
    }

    pub fn push(&mut self, op: OpRef) -> Result<(), OperationsError> {
        let (name, capability, added) = operation::describe(&op)?;
        if capability != self.capability {
            return Err(OperationsError::TypeMismatch {
                name,
                expected: self.capability,
                found: capability,
            });
        }
        if added || self.contains(&op) {
            return Err(OperationsError::DoubleAdd { name });
        }

        if let Some(engine) = &self.synced {
            let entry = self.attach_entry(&op, engine)?;
            engine
                .try_borrow_mut()
                .map_err(|_| OperationsError::Busy)?
                .insert(self.collection, self.items.len(), entry)?;
        }
        operation::borrow_mut(&op)?.lifecycle_mut().mark_added();
        debug!(%name, collection = %self.collection, "Appended operation.");
        self.items.push(op);
        Ok(())
    }

    /// Takes `op` out of the list, detaching it first when synced.
    pub fn remove(&mut self, op: &OpRef) -> Result<OpRef, OperationsError> {
        let Some(index) = self.position(op) else {
            let (name, _, _) = operation::describe(op)?;
            return Err(OperationsError::NotMember { name });
        };
        if let Some(engine) = &self.synced {
            engine
                .try_borrow_mut()
                .map_err(|_| OperationsError::Busy)?
                .remove(self.collection, index)?;
            operation::detach(op, Some(engine))?;
        }
        Ok(self.items.remove(index))
    }

    /// Attaches every member and mirrors the list into the engine.
    pub fn sync(&mut self, engine: &EngineRef) -> Result<(), OperationsError> {
        engine
            .try_borrow_mut()
            .map_err(|_| OperationsError::Busy)?
            .clear(self.collection);
        for (index, op) in self.items.iter().enumerate() {
            let entry = self.attach_entry(op, engine)?;
            engine
                .try_borrow_mut()
                .map_err(|_| OperationsError::Busy)?
                .insert(self.collection, index, entry)?;
        }
        self.synced = Some(engine.clone());
        info!(
            collection = %self.collection,
            count = self.items.len(),
            "Synchronized operations with engine."
        );
        Ok(())
    }

    /// Detaches every member and empties the native collection.
    pub fn unsync(&mut self) -> Result<(), OperationsError> {
        let Some(engine) = self.synced.take() else {
            return Ok(());
        };
        engine
            .try_borrow_mut()
            .map_err(|_| OperationsError::Busy)?
            .clear(self.collection);
        for op in &self.items {
            operation::detach(op, Some(&engine))?;
        }
        info!(collection = %self.collection, "Desynchronized operations from engine.");
        Ok(())
    }

    fn attach_entry(&self, op: &OpRef, engine: &EngineRef) -> Result<NativeEntry, OperationsError> {
        let handle = operation::attach(op, engine)?;
        let op = operation::borrow(op)?;
        Ok((self.conversion)(&*op, handle))
    }
}

impl<'a> IntoIterator for &'a SyncedList {
    type Item = &'a OpRef;
    type IntoIter = std::slice::Iter<'a, OpRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::{Shared, shared};
    use crate::engine::Trigger;
    use crate::engine::reference::ReferenceEngine;
    use crate::operations::builtin::TriggeredOperation;

    fn analyzers() -> SyncedList {
        SyncedList::new(
            Capability::Analyzer,
            CollectionKind::Analyzers,
            triggered_conversion,
        )
    }

    fn analyzer(name: &str, period: u64) -> OpRef {
        shared(TriggeredOperation::analyzer(name, Trigger::periodic(period)))
    }

    fn engine() -> (Shared<ReferenceEngine>, EngineRef) {
        let engine = shared(ReferenceEngine::with_state(0));
        let dyn_engine: EngineRef = engine.clone();
        (engine, dyn_engine)
    }

    #[test]
    fn push_rejects_other_capabilities() {
        let mut list = analyzers();
        let updater: OpRef = shared(TriggeredOperation::updater("box", Trigger::periodic(1)));

        assert!(matches!(
            list.push(updater.clone()),
            Err(OperationsError::TypeMismatch {
                expected: Capability::Analyzer,
                found: Capability::Updater,
                ..
            })
        ));
        assert!(list.is_empty());
        assert!(!updater.borrow().lifecycle().is_added());
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut list = analyzers();
        let op = analyzer("thermo", 10);

        list.push(op.clone()).unwrap();

        assert!(matches!(
            list.push(op.clone()),
            Err(OperationsError::DoubleAdd { .. })
        ));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn sync_mirrors_members_in_order() {
        let (native, engine) = engine();
        let mut list = analyzers();
        let first = analyzer("first", 2);
        let second = analyzer("second", 3);
        list.push(first.clone()).unwrap();
        list.push(second.clone()).unwrap();

        list.sync(&engine).unwrap();

        assert!(list.is_synced());
        let native = native.borrow();
        let entries = native.collection(CollectionKind::Analyzers);
        let handles: Vec<_> = entries.iter().map(|entry| Some(entry.handle)).collect();
        assert_eq!(
            handles,
            vec![
                first.borrow().lifecycle().handle(),
                second.borrow().lifecycle().handle()
            ]
        );
        assert_eq!(entries[1].trigger, Some(Trigger::periodic(3)));
    }

    #[test]
    fn synced_push_and_remove_update_the_engine() {
        let (native, engine) = engine();
        let mut list = analyzers();
        list.sync(&engine).unwrap();
        let op = analyzer("late", 5);

        list.push(op.clone()).unwrap();
        assert!(op.borrow().lifecycle().is_attached());
        assert_eq!(native.borrow().collection(CollectionKind::Analyzers).len(), 1);

        let removed = list.remove(&op).unwrap();
        assert!(same_op(&removed, &op));
        assert!(!op.borrow().lifecycle().is_attached());
        assert!(native.borrow().collection(CollectionKind::Analyzers).is_empty());
        assert_eq!(native.borrow().live_objects(), 0);
    }

    #[test]
    fn unsync_detaches_but_keeps_members() {
        let (native, engine) = engine();
        let mut list = analyzers();
        let op = analyzer("thermo", 10);
        list.push(op.clone()).unwrap();
        list.sync(&engine).unwrap();

        list.unsync().unwrap();

        assert!(!list.is_synced());
        assert!(list.contains(&op));
        assert!(!op.borrow().lifecycle().is_attached());
        assert!(op.borrow().lifecycle().is_added());
        assert_eq!(native.borrow().live_objects(), 0);
        assert_eq!(list.unsync(), Ok(()));
    }

    #[test]
    fn tuner_entries_carry_no_trigger() {
        let (native, engine) = engine();
        let mut tuners = SyncedList::new(Capability::Tuner, CollectionKind::Tuners, handle_conversion);
        tuners
            .push(shared(TriggeredOperation::tuner("nlist", Trigger::periodic(100))))
            .unwrap();

        tuners.sync(&engine).unwrap();

        assert_eq!(native.borrow().collection(CollectionKind::Tuners)[0].trigger, None);
    }
}
