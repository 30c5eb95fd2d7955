use crate::engine::{Capability, EngineError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationsError {
    #[error("Operation '{name}' cannot be added twice to operation lists")]
    DoubleAdd { name: String },

    #[error("Operation '{name}' is a {found}, expected a {expected}")]
    TypeMismatch {
        name: String,
        expected: Capability,
        found: Capability,
    },

    #[error("System not initialized yet")]
    NotInitialized,

    #[error("Cannot remove integrator '{name}' without setting a new integrator")]
    RemoveIntegrator { name: String },

    #[error("Operation '{name}' is not a member of this container")]
    NotMember { name: String },

    #[error("Operation is borrowed elsewhere and cannot be updated")]
    Busy,

    #[error("Engine call failed: {source}")]
    Engine {
        #[from]
        source: EngineError,
    },
}
