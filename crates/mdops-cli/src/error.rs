use mdops::core::logger::LoggerError;
use mdops::operations::OperationsError;
use mdops::workflows::error::WorkflowError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Operations(#[from] OperationsError),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to render output: {0}")]
    Output(#[source] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
