//! Core enums shared across the client.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The optimization goal for a single metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Lower metric values are better.
    Minimize,
    /// Higher metric values are better.
    Maximize,
}

/// The lifecycle state of a trial.
///
/// `Active` is the only start state. `Completed` and `Infeasible` are
/// terminal: once a trial reaches either, no further transition occurs.
/// `RequestedToStop` is an advisory, non-terminal state set by the service
/// when an early-stopping decision asks the assigned worker to wrap up;
/// the trial still has to be completed by its worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialStatus {
    /// The trial is assigned and awaiting (or under) evaluation.
    Active,
    /// The service asked the worker to stop evaluating this trial early.
    RequestedToStop,
    /// The trial finished with a final measurement.
    Completed,
    /// The trial could not be evaluated; carries an infeasibility reason.
    Infeasible,
}

impl TrialStatus {
    /// Returns `true` for `Completed` and `Infeasible`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TrialStatus::Completed | TrialStatus::Infeasible)
    }
}
