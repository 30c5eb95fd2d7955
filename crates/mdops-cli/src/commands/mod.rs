pub mod quantities;
pub mod run;

use crate::config::{AppConfig, OperationSettings};
use crate::error::Result;
use mdops::core::logger::Logger;
use mdops::core::shared::{Shared, shared};
use mdops::engine::reference::ReferenceEngine;
use mdops::engine::{Capability, EngineRef};
use mdops::operations::Operations;
use mdops::operations::builtin::{Integrator, ParticleSorter, TriggeredOperation};
use mdops::workflows::simulation::Simulation;
use tracing::{debug, info, warn};

/// A simulation built from a run file, with its logger already populated.
pub struct Assembly {
    pub simulation: Shared<Simulation>,
    pub logger: Logger,
}

pub fn assemble(config: &AppConfig) -> Result<Assembly> {
    let engine: EngineRef = shared(ReferenceEngine::with_state(config.initial_timestep));
    let mut simulation = Simulation::with_operations(engine, Operations::empty());
    let mut logger = Logger::new();
    let log_operations = config.log.operations;

    let integrator = shared(Integrator::named(
        config.integrator.name.clone(),
        config.integrator.dt,
    ));
    simulation.operations_mut().add(integrator.clone())?;
    if log_operations {
        logger.add(&integrator, None)?;
    }

    if let Some(settings) = &config.sorter {
        let sorter = shared(ParticleSorter::new(settings.trigger, settings.grid));
        simulation.operations_mut().add(sorter.clone())?;
        if log_operations {
            logger.add(&sorter, None)?;
        }
    }

    let lists = [
        (Capability::Tuner, &config.tuners),
        (Capability::Updater, &config.updaters),
        (Capability::Analyzer, &config.analyzers),
    ];
    for (capability, entries) in lists {
        for settings in entries {
            let operation = shared(triggered(capability, settings));
            simulation.operations_mut().add(operation.clone())?;
            if log_operations {
                logger.add(&operation, None)?;
            }
            debug!(name = %settings.name, %capability, trigger = %settings.trigger, "Configured operation.");
        }
    }

    let simulation = shared(simulation);
    if config.log.simulation {
        logger.add(&simulation, None)?;
    }

    if !config.log.exclude.is_empty() {
        let removed = logger.remove_names(&config.log.exclude);
        if removed < config.log.exclude.len() {
            warn!(
                requested = config.log.exclude.len(),
                removed, "Some excluded quantities were not being logged."
            );
        }
    }

    info!(
        operations = simulation.borrow().operations().len(),
        quantities = logger.len(),
        "Assembled simulation from run file."
    );
    Ok(Assembly { simulation, logger })
}

fn triggered(capability: Capability, settings: &OperationSettings) -> TriggeredOperation {
    let name = settings.name.clone();
    match capability {
        Capability::Updater => TriggeredOperation::updater(name, settings.trigger),
        Capability::Analyzer => TriggeredOperation::analyzer(name, settings.trigger),
        _ => TriggeredOperation::tuner(name, settings.trigger),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::config::{IntegratorSettings, LogSettings, SorterSettings};
    use mdops::core::namespace::Namespace;
    use mdops::engine::Trigger;
    use mdops::workflows::config::RunConfig;

    pub(crate) fn app_config() -> AppConfig {
        AppConfig {
            run: RunConfig {
                steps: 20,
                log_period: 10,
            },
            format: OutputFormat::Json,
            initial_timestep: 0,
            integrator: IntegratorSettings {
                name: "nve".to_string(),
                dt: 0.005,
            },
            sorter: Some(SorterSettings {
                trigger: Trigger::periodic(200),
                grid: None,
            }),
            tuners: vec![],
            updaters: vec![],
            analyzers: vec![
                OperationSettings {
                    name: "thermo".to_string(),
                    trigger: Trigger::periodic(5),
                },
                OperationSettings {
                    name: "pressure".to_string(),
                    trigger: Trigger::periodic(10),
                },
            ],
            log: LogSettings {
                simulation: true,
                operations: true,
                exclude: vec![],
            },
        }
    }

    #[test]
    fn assembly_adds_every_configured_operation() {
        let assembly = assemble(&app_config()).unwrap();

        let simulation = assembly.simulation.borrow();
        let operations = simulation.operations();
        assert!(operations.integrator().is_some());
        assert_eq!(operations.tuners().len(), 1);
        assert_eq!(operations.analyzers().len(), 2);
        assert_eq!(operations.len(), 4);
    }

    #[test]
    fn repeated_operation_types_get_distinct_namespaces() {
        let assembly = assemble(&app_config()).unwrap();
        let base = ["mdops", "operations", "builtin", "TriggeredOperation"];

        let first = Namespace::from([base[0], base[1], base[2], base[3], "name"]);
        let second = Namespace::from([base[0], base[1], base[2], "TriggeredOperation_1", "name"]);
        assert!(assembly.logger.key_exists(&first));
        assert!(assembly.logger.key_exists(&second));
    }

    #[test]
    fn logging_can_be_limited_to_the_simulation() {
        let mut config = app_config();
        config.log.operations = false;
        config.log.exclude = vec![Namespace::from(["mdops", "Simulation", "operation_count"])];

        let assembly = assemble(&config).unwrap();

        let namespaces: Vec<String> = assembly
            .logger
            .namespaces()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(namespaces, vec!["mdops.Simulation.timestep"]);
    }
}
