use crate::cli::OutputFormat;
use mdops::core::namespace::Namespace;
use mdops::engine::Trigger;
use mdops::workflows::config::RunConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorSettings {
    pub name: String,
    pub dt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SorterSettings {
    pub trigger: Trigger,
    pub grid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationSettings {
    pub name: String,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub simulation: bool,
    pub operations: bool,
    pub exclude: Vec<Namespace>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub run: RunConfig,
    pub format: OutputFormat,
    pub initial_timestep: u64,
    pub integrator: IntegratorSettings,
    pub sorter: Option<SorterSettings>,
    pub tuners: Vec<OperationSettings>,
    pub updaters: Vec<OperationSettings>,
    pub analyzers: Vec<OperationSettings>,
    pub log: LogSettings,
}
