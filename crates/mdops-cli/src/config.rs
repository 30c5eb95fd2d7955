mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{RunOverrides, build_config};
pub use models::{AppConfig, IntegratorSettings, LogSettings, OperationSettings, SorterSettings};
