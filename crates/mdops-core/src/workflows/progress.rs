/// Milestones of a [`run`](super::run::run), in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Operations are attached; stepping starts from `timestep`.
    Scheduled { timestep: u64 },
    Started { total_steps: u64 },
    /// One step completed; `timestep` is the engine's new step number.
    Stepped { timestep: u64 },
    Snapshot { timestep: u64 },
    Finished { final_timestep: u64 },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + 'a>;

/// Optional sink for [`Progress`] events. Without a callback every event is
/// dropped.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::Started { total_steps: 3 });
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = RefCell::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.borrow_mut().push(event);
        }));

        reporter.report(Progress::Stepped { timestep: 10 });
        reporter.report(Progress::Snapshot { timestep: 10 });
        reporter.report(Progress::Finished { final_timestep: 10 });
        drop(reporter);

        assert_eq!(
            seen.into_inner(),
            vec![
                Progress::Stepped { timestep: 10 },
                Progress::Snapshot { timestep: 10 },
                Progress::Finished { final_timestep: 10 },
            ]
        );
    }
}
