use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileOperationConfig};
use super::models::{AppConfig, IntegratorSettings, LogSettings, OperationSettings, SorterSettings};
use crate::cli::{OutputFormat, RunArgs};
use crate::error::{CliError, Result};
use clap::ValueEnum;
use mdops::core::namespace::Namespace;
use mdops::engine::Trigger;
use mdops::workflows::config::RunConfigBuilder;
use std::path::Path;
use std::str::FromStr;

/// Command-line values that take precedence over the run file.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOverrides {
    pub steps: Option<u64>,
    pub log_period: Option<u64>,
    pub format: Option<OutputFormat>,
}

impl From<&RunArgs> for RunOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            steps: args.steps,
            log_period: args.log_period,
            format: args.format,
        }
    }
}

pub fn build_config(
    config_path: &Path,
    set_values: &[String],
    overrides: &RunOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(config_path)?;
    let mut file_config = apply_set_values(file_config, set_values)?;

    let run_file = file_config.run.take().unwrap_or_default();
    let run = RunConfigBuilder::new()
        .steps(overrides.steps.or(run_file.steps).unwrap_or(defaults.steps))
        .log_period(
            overrides
                .log_period
                .or(run_file.log_period)
                .unwrap_or(defaults.log_period),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;
    let format = overrides
        .format
        .or(run_file.format)
        .unwrap_or(defaults.format);

    let initial_timestep = file_config
        .state
        .take()
        .and_then(|state| state.timestep)
        .unwrap_or(defaults.timestep);

    let integrator_file = file_config.integrator.take().unwrap_or_default();
    let integrator = IntegratorSettings {
        name: integrator_file
            .name
            .unwrap_or_else(|| defaults.integrator_name.clone()),
        dt: integrator_file.dt.unwrap_or(defaults.dt),
    };
    if !(integrator.dt.is_finite() && integrator.dt > 0.0) {
        return Err(CliError::Config(format!(
            "`integrator.dt` must be a positive number, got {}",
            integrator.dt
        )));
    }

    let sorter_file = file_config.sorter.take().unwrap_or_default();
    let sorter = sorter_file
        .enabled
        .unwrap_or(defaults.sorter_enabled)
        .then(|| SorterSettings {
            trigger: Trigger::periodic(sorter_file.period.unwrap_or(defaults.sorter_period)),
            grid: sorter_file.grid,
        });

    let log_file = file_config.log.take().unwrap_or_default();
    let log = LogSettings {
        simulation: log_file.simulation.unwrap_or(defaults.log_simulation),
        operations: log_file.operations.unwrap_or(defaults.log_operations),
        exclude: log_file
            .exclude
            .iter()
            .map(|path| parse_namespace(path))
            .collect::<Result<_>>()?,
    };

    Ok(AppConfig {
        run,
        format,
        initial_timestep,
        integrator,
        sorter,
        tuners: operation_settings(file_config.tuners),
        updaters: operation_settings(file_config.updaters),
        analyzers: operation_settings(file_config.analyzers),
        log,
    })
}

fn operation_settings(entries: Vec<FileOperationConfig>) -> Vec<OperationSettings> {
    entries
        .into_iter()
        .map(|entry| OperationSettings {
            name: entry.name,
            trigger: entry.trigger,
        })
        .collect()
}

fn parse_namespace(path: &str) -> Result<Namespace> {
    if path.split('.').any(str::is_empty) {
        return Err(CliError::Config(format!(
            "Invalid namespace in `log.exclude`: '{}'",
            path
        )));
    }
    Ok(Namespace::new(path.split('.')))
}

fn parse_value<T: FromStr>(key: &str, value_str: &str, kind: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "run.steps" => {
                config.run.get_or_insert_with(Default::default).steps =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "run.log-period" => {
                config.run.get_or_insert_with(Default::default).log_period =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "run.format" => {
                let format = OutputFormat::from_str(value_str, true).map_err(|_| {
                    CliError::Config(format!("Invalid format for {}: {}", key, value_str))
                })?;
                config.run.get_or_insert_with(Default::default).format = Some(format);
            }
            "state.timestep" => {
                config.state.get_or_insert_with(Default::default).timestep =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "integrator.dt" => {
                config.integrator.get_or_insert_with(Default::default).dt =
                    Some(parse_value(key, value_str, "float")?);
            }
            "sorter.enabled" => {
                config.sorter.get_or_insert_with(Default::default).enabled =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "sorter.period" => {
                config.sorter.get_or_insert_with(Default::default).period =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "log.simulation" => {
                config.log.get_or_insert_with(Default::default).simulation =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "log.operations" => {
                config.log.get_or_insert_with(Default::default).operations =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("run.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "");

        let config = build_config(&path, &[], &RunOverrides::default()).unwrap();

        assert_eq!(config.run.steps, 1000);
        assert_eq!(config.run.log_period, 100);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.initial_timestep, 0);
        assert_eq!(config.integrator.name, "integrator");
        assert_eq!(config.integrator.dt, 0.005);
        assert_eq!(
            config.sorter,
            Some(SorterSettings {
                trigger: Trigger::periodic(200),
                grid: None
            })
        );
        assert!(config.analyzers.is_empty());
        assert!(config.log.simulation && config.log.operations);
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [run]
            steps = 50
            log-period = 5
            format = "toml"

            [state]
            timestep = 100

            [integrator]
            name = "nve"
            dt = 0.002

            [sorter]
            enabled = false

            [[analyzers]]
            name = "thermo"
            trigger = { type = "periodic", period = 10, phase = 2 }

            [[updaters]]
            name = "box"
            trigger = { type = "after", step = 120 }

            [log]
            operations = false
            exclude = ["mdops.Simulation.operation_count"]
            "#,
        );

        let config = build_config(&path, &[], &RunOverrides::default()).unwrap();

        assert_eq!(config.run.steps, 50);
        assert_eq!(config.run.log_period, 5);
        assert_eq!(config.format, OutputFormat::Toml);
        assert_eq!(config.initial_timestep, 100);
        assert_eq!(config.integrator.name, "nve");
        assert_eq!(config.sorter, None);
        assert_eq!(
            config.analyzers,
            vec![OperationSettings {
                name: "thermo".to_string(),
                trigger: Trigger::Periodic {
                    period: 10,
                    phase: 2
                },
            }]
        );
        assert_eq!(config.updaters[0].trigger, Trigger::After { step: 120 });
        assert!(!config.log.operations);
        assert_eq!(
            config.log.exclude,
            vec![Namespace::from(["mdops", "Simulation", "operation_count"])]
        );
    }

    #[test]
    fn cli_overrides_beat_set_values_which_beat_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[run]\nsteps = 50\nlog-period = 5\n");
        let set_values = vec!["run.steps=70".to_string(), "integrator.dt=0.01".to_string()];
        let overrides = RunOverrides {
            log_period: Some(7),
            ..RunOverrides::default()
        };

        let config = build_config(&path, &set_values, &overrides).unwrap();

        assert_eq!(config.run.steps, 70);
        assert_eq!(config.run.log_period, 7);
        assert_eq!(config.integrator.dt, 0.01);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[run]\nstepz = 50\n");

        let result = build_config(&path, &[], &RunOverrides::default());

        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "");

        for bad in ["run.steps", "run.steps=many", "unknown.key=1", "run.format=xml"] {
            let result = build_config(&path, &[bad.to_string()], &RunOverrides::default());
            assert!(
                matches!(result, Err(CliError::Config(_))),
                "expected a configuration error for {bad}"
            );
        }
    }

    #[test]
    fn zero_log_period_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[run]\nlog-period = 0\n");

        let result = build_config(&path, &[], &RunOverrides::default());

        assert!(matches!(result, Err(CliError::Config(message)) if message.contains("log_period")));
    }

    #[test]
    fn non_positive_timestep_size_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[integrator]\ndt = -1.0\n");

        let result = build_config(&path, &[], &RunOverrides::default());

        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
