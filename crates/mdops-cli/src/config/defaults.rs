use crate::cli::OutputFormat;

pub struct DefaultsConfig {
    pub steps: u64,
    pub log_period: u64,
    pub format: OutputFormat,
    pub timestep: u64,
    pub integrator_name: String,
    pub dt: f64,
    pub sorter_enabled: bool,
    pub sorter_period: u64,
    pub log_simulation: bool,
    pub log_operations: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            log_period: 100,
            format: OutputFormat::Json,
            timestep: 0,
            integrator_name: "integrator".to_string(),
            dt: 0.005,
            sorter_enabled: true,
            sorter_period: 200,
            log_simulation: true,
            log_operations: true,
        }
    }
}
