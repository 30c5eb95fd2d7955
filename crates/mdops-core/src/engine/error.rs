use super::CollectionKind;
use super::ids::NativeHandle;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No simulation state has been loaded")]
    NoState,

    #[error("Native handle {0:?} does not refer to a live engine object")]
    StaleHandle(NativeHandle),

    #[error("Index {index} is out of range for the {kind} collection of length {len}")]
    IndexOutOfRange {
        kind: CollectionKind,
        index: usize,
        len: usize,
    },
}
