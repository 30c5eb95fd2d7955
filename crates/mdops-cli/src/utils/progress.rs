use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mdops::workflows::progress::{Progress, ProgressCallback};

const BAR_TEMPLATE: &str = "{msg:<24} [{bar:40.cyan/blue}] {pos}/{len}";

/// Drives one stderr progress bar from the events of a run.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: ProgressBar,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        let bar = ProgressBar::with_draw_target(Some(0), target)
            .with_style(style)
            .with_message("Scheduling");
        Self { bar }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();

        Box::new(move |progress: Progress| match progress {
            Progress::Scheduled { timestep } => {
                bar.set_message(format!("Running from step {timestep}"));
            }
            Progress::Started { total_steps } => {
                bar.set_length(total_steps);
                bar.set_position(0);
            }
            Progress::Stepped { .. } => bar.inc(1),
            Progress::Snapshot { timestep } => {
                bar.set_message(format!("Logged step {timestep}"));
            }
            Progress::Finished { final_timestep } => {
                bar.finish_with_message(format!("Done at step {final_timestep}"));
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
