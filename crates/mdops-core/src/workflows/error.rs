use super::config::ConfigError;
use crate::core::logger::LoggerError;
use crate::engine::EngineError;
use crate::operations::OperationsError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Operations error: {source}")]
    Operations {
        #[from]
        source: OperationsError,
    },

    #[error("Engine error: {source}")]
    Engine {
        #[from]
        source: EngineError,
    },

    #[error("Logging error: {source}")]
    Logger {
        #[from]
        source: LoggerError,
    },

    #[error("Simulation is borrowed elsewhere and cannot be advanced")]
    Busy,
}
