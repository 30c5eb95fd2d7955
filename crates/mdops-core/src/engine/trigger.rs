use serde::{Deserialize, Serialize};
use std::fmt;

/// Decides on which timesteps an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Trigger {
    /// Fires when `step >= phase` and `step - phase` is a multiple of `period`.
    Periodic {
        period: u64,
        #[serde(default)]
        phase: u64,
    },
    /// Fires on exactly one step.
    On { step: u64 },
    /// Fires on every step strictly after `step`.
    After { step: u64 },
}

impl Trigger {
    pub fn periodic(period: u64) -> Self {
        Trigger::Periodic { period, phase: 0 }
    }

    pub fn compute(&self, step: u64) -> bool {
        match *self {
            Trigger::Periodic { period, phase } => {
                period > 0 && step >= phase && (step - phase) % period == 0
            }
            Trigger::On { step: target } => step == target,
            Trigger::After { step: target } => step > target,
        }
    }

    pub fn period(&self) -> Option<u64> {
        match self {
            Trigger::Periodic { period, .. } => Some(*period),
            _ => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Periodic { period, phase } => write!(f, "periodic({period}, phase={phase})"),
            Trigger::On { step } => write!(f, "on({step})"),
            Trigger::After { step } => write!(f, "after({step})"),
        }
    }
}
