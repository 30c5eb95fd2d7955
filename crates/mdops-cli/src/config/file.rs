use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use mdops::engine::Trigger;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRunConfig {
    pub steps: Option<u64>,
    pub log_period: Option<u64>,
    pub format: Option<OutputFormat>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileStateConfig {
    pub timestep: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileIntegratorConfig {
    pub name: Option<String>,
    pub dt: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSorterConfig {
    pub enabled: Option<bool>,
    pub period: Option<u64>,
    pub grid: Option<u32>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileOperationConfig {
    pub name: String,
    pub trigger: Trigger,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileLogConfig {
    pub simulation: Option<bool>,
    pub operations: Option<bool>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub run: Option<FileRunConfig>,
    pub state: Option<FileStateConfig>,
    pub integrator: Option<FileIntegratorConfig>,
    pub sorter: Option<FileSorterConfig>,
    #[serde(default)]
    pub tuners: Vec<FileOperationConfig>,
    #[serde(default)]
    pub updaters: Vec<FileOperationConfig>,
    #[serde(default)]
    pub analyzers: Vec<FileOperationConfig>,
    pub log: Option<FileLogConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading run file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
