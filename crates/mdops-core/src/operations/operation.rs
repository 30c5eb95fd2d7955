use super::error::OperationsError;
use crate::engine::{Capability, EngineRef, NativeHandle, OperationSpec, Trigger};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::debug;

/// Where an operation is in its add/attach lifecycle.
///
/// `added` becomes true once a container accepts the operation. `handle` is
/// present exactly while the engine holds a live counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    added: bool,
    handle: Option<NativeHandle>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    pub(crate) fn mark_added(&mut self) {
        self.added = true;
    }

    pub(crate) fn release(&mut self) {
        self.added = false;
    }
}

/// A unit of per-step work scheduled around the integrator.
pub trait Operation: 'static {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    fn trigger(&self) -> Option<Trigger> {
        None
    }

    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Called when this operation is about to be disconnected from its
    /// simulation, before it is detached.
    fn notify_disconnect(&mut self) {}

    fn spec(&self) -> OperationSpec {
        OperationSpec {
            name: self.name().to_string(),
            capability: self.capability(),
        }
    }
}

pub type OpRef = Rc<RefCell<dyn Operation>>;

/// Reference identity between two operation handles.
pub fn same_op(a: &OpRef, b: &OpRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub(crate) fn borrow(op: &OpRef) -> Result<Ref<'_, dyn Operation>, OperationsError> {
    op.try_borrow().map_err(|_| OperationsError::Busy)
}

pub(crate) fn borrow_mut(op: &OpRef) -> Result<RefMut<'_, dyn Operation>, OperationsError> {
    op.try_borrow_mut().map_err(|_| OperationsError::Busy)
}

/// Name, capability and added flag in one borrow.
pub(crate) fn describe(op: &OpRef) -> Result<(String, Capability, bool), OperationsError> {
    let op = borrow(op)?;
    Ok((
        op.name().to_string(),
        op.capability(),
        op.lifecycle().is_added(),
    ))
}

/// Creates the engine-side counterpart unless one already exists.
pub(crate) fn attach(op: &OpRef, engine: &EngineRef) -> Result<NativeHandle, OperationsError> {
    let mut op = borrow_mut(op)?;
    if let Some(handle) = op.lifecycle().handle() {
        return Ok(handle);
    }
    let spec = op.spec();
    let handle = engine
        .try_borrow_mut()
        .map_err(|_| OperationsError::Busy)?
        .create(&spec)?;
    op.lifecycle_mut().handle = Some(handle);
    debug!(name = %spec.name, capability = %spec.capability, "Attached operation.");
    Ok(handle)
}

/// Releases the engine-side counterpart, if any.
pub(crate) fn detach(op: &OpRef, engine: Option<&EngineRef>) -> Result<(), OperationsError> {
    let mut op = borrow_mut(op)?;
    let Some(handle) = op.lifecycle().handle() else {
        return Ok(());
    };
    if let Some(engine) = engine {
        engine
            .try_borrow_mut()
            .map_err(|_| OperationsError::Busy)?
            .destroy(handle)?;
    }
    // Only forget the handle once the engine has let go of it.
    op.lifecycle_mut().handle = None;
    debug!(name = op.name(), "Detached operation.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::shared;
    use crate::engine::reference::ReferenceEngine;
    use crate::operations::builtin::TriggeredOperation;

    fn analyzer() -> OpRef {
        shared(TriggeredOperation::analyzer("thermo", Trigger::periodic(5)))
    }

    #[test]
    fn attach_is_idempotent() {
        let engine: EngineRef = shared(ReferenceEngine::with_state(0));
        let op = analyzer();

        let first = attach(&op, &engine).unwrap();
        let second = attach(&op, &engine).unwrap();

        assert_eq!(first, second);
        assert_eq!(op.borrow().lifecycle().handle(), Some(first));
    }

    #[test]
    fn detach_clears_the_handle_after_destroying() {
        let engine: EngineRef = shared(ReferenceEngine::with_state(0));
        let op = analyzer();
        attach(&op, &engine).unwrap();

        detach(&op, Some(&engine)).unwrap();

        assert!(!op.borrow().lifecycle().is_attached());
        assert_eq!(detach(&op, Some(&engine)), Ok(()));
    }

    #[test]
    fn failed_destroy_keeps_the_handle() {
        let engine: EngineRef = shared(ReferenceEngine::with_state(0));
        let op = analyzer();
        let handle = attach(&op, &engine).unwrap();

        let result = {
            let _held = engine.borrow();
            detach(&op, Some(&engine))
        };

        assert_eq!(result, Err(OperationsError::Busy));
        assert_eq!(op.borrow().lifecycle().handle(), Some(handle));

        detach(&op, Some(&engine)).unwrap();
        assert!(!op.borrow().lifecycle().is_attached());
    }
}
