use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How long to run and how often to snapshot the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub steps: u64,
    pub log_period: u64,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_period == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "log_period",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RunConfigBuilder {
    steps: Option<u64>,
    log_period: Option<u64>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn log_period(mut self, period: u64) -> Self {
        self.log_period = Some(period);
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let steps = self.steps.ok_or(ConfigError::MissingParameter("steps"))?;
        let log_period = self
            .log_period
            .ok_or(ConfigError::MissingParameter("log_period"))?;
        let config = RunConfig { steps, log_period };
        config.validate()?;
        Ok(config)
    }
}
