use super::{Assembly, assemble};
use crate::cli::RunArgs;
use crate::config::{AppConfig, RunOverrides, build_config};
use crate::error::Result;
use crate::utils::output;
use crate::utils::progress::CliProgressHandler;
use mdops::workflows;
use mdops::workflows::error::WorkflowError;
use mdops::workflows::progress::ProgressReporter;
use mdops::workflows::run::RunResult;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let config = build_config(&args.config, &args.set_values, &RunOverrides::from(&args))?;
    info!(
        steps = config.run.steps,
        log_period = config.run.log_period,
        "Loaded run configuration."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let result = execute(&config, &reporter)?;

    let rendered = output::render(&result, config.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!(
                "Wrote {} snapshot(s) to {}",
                result.snapshots.len(),
                path.display()
            );
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Assembles the simulation, runs it and detaches everything afterwards.
fn execute(config: &AppConfig, reporter: &ProgressReporter) -> Result<RunResult> {
    let Assembly { simulation, logger } = assemble(config)?;

    let result = workflows::run::run(&simulation, &logger, &config.run, reporter)?;

    simulation
        .try_borrow_mut()
        .map_err(|_| WorkflowError::Busy)?
        .operations_mut()
        .unschedule()?;
    info!(
        final_timestep = result.final_timestep,
        "Simulation finished and operations unscheduled."
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::app_config;

    #[test]
    fn execute_collects_periodic_snapshots() {
        let result = execute(&app_config(), &ProgressReporter::new()).unwrap();

        assert_eq!(result.final_timestep, 20);
        let steps: Vec<u64> = result.snapshots.iter().map(|s| s.timestep).collect();
        assert_eq!(steps, vec![10, 20]);
    }

    #[test]
    fn execute_starts_from_the_configured_timestep() {
        let mut config = app_config();
        config.initial_timestep = 1000;
        config.run.steps = 5;

        let result = execute(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.initial_timestep, 1000);
        assert_eq!(result.final_timestep, 1005);
        assert_eq!(result.snapshots.len(), 1);
    }

    #[test]
    fn snapshots_render_as_json() {
        let result = execute(&app_config(), &ProgressReporter::new()).unwrap();
        let rendered = output::render(&result, crate::cli::OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(
            value["snapshots"][1]["data"]["mdops"]["Simulation"]["timestep"],
            serde_json::json!([20, "scalar"])
        );
        assert_eq!(
            value["snapshots"][0]["data"]["mdops"]["operations"]["builtin"]["Integrator"]["attached"],
            serde_json::json!([true, "scalar"])
        );
    }
}
