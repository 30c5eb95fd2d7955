use super::config::RunConfig;
use super::error::WorkflowError;
use super::progress::{Progress, ProgressReporter};
use super::simulation::Simulation;
use crate::core::logger::{LogTree, Logger};
use crate::core::shared::Shared;
use serde::Serialize;
use tracing::{info, instrument};

/// The logger's contents at one timestep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestep: u64,
    pub data: LogTree,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub initial_timestep: u64,
    pub final_timestep: u64,
    pub snapshots: Vec<Snapshot>,
}

#[instrument(skip_all, name = "run_workflow", fields(steps = config.steps))]
pub fn run(
    simulation: &Shared<Simulation>,
    logger: &Logger,
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<RunResult, WorkflowError> {
    config.validate()?;

    // === Phase 1: Scheduling ===
    let initial_timestep = {
        let mut sim = simulation
            .try_borrow_mut()
            .map_err(|_| WorkflowError::Busy)?;
        if !sim.operations().is_scheduled() {
            sim.operations_mut().schedule()?;
        }
        sim.timestep()
    };
    info!(
        timestep = initial_timestep,
        logged = logger.len(),
        "Operations scheduled, starting run."
    );
    reporter.report(Progress::Scheduled {
        timestep: initial_timestep,
    });

    // === Phase 2: Stepping ===
    reporter.report(Progress::Started {
        total_steps: config.steps,
    });
    let mut snapshots = Vec::new();
    let mut last_logged = None;
    for completed in 1..=config.steps {
        let timestep = simulation
            .try_borrow_mut()
            .map_err(|_| WorkflowError::Busy)?
            .step()?;
        reporter.report(Progress::Stepped { timestep });

        if completed % config.log_period == 0 {
            snapshots.push(take_snapshot(logger, timestep, reporter)?);
            last_logged = Some(timestep);
        }
    }

    // === Phase 3: Final snapshot ===
    let final_timestep = simulation
        .try_borrow()
        .map_err(|_| WorkflowError::Busy)?
        .timestep();
    if last_logged != Some(final_timestep) {
        snapshots.push(take_snapshot(logger, final_timestep, reporter)?);
    }
    reporter.report(Progress::Finished { final_timestep });

    info!(
        final_timestep,
        snapshots = snapshots.len(),
        "Run complete."
    );
    Ok(RunResult {
        initial_timestep,
        final_timestep,
        snapshots,
    })
}

fn take_snapshot(
    logger: &Logger,
    timestep: u64,
    reporter: &ProgressReporter,
) -> Result<Snapshot, WorkflowError> {
    let data = logger.log()?;
    reporter.report(Progress::Snapshot { timestep });
    Ok(Snapshot { timestep, data })
}
