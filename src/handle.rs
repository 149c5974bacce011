//! Backend-agnostic Study/Trial capability interfaces.
//!
//! Orchestration code (worker loops, schedulers) should program against
//! [`StudyHandle`] and [`TrialHandle`] rather than the concrete
//! gateway-backed types, so it stays portable across backends. The
//! gateway-backed [`Study`](crate::Study) / [`Trial`](crate::Trial) pair
//! is the one adapter shipped in this crate.
//!
//! Every method here may block on a service round-trip and may fail with
//! a transport error; none of them defines timeout or retry semantics.

use std::collections::HashMap;

use crate::config::StudyConfig;
use crate::error::Result;
use crate::measurement::Measurement;
use crate::record::{ParamValue, TrialRecord};
use crate::types::TrialStatus;

/// Predicate applied by [`StudyHandle::trials`]; a trial failing it is
/// simply excluded, never an error.
pub type TrialPredicate = dyn Fn(&TrialRecord) -> bool;

/// Operations on one trial under evaluation.
pub trait TrialHandle {
    /// Unique identifier of the trial within its study.
    fn uid(&self) -> u64;

    /// The trial's lifecycle state, from the handle's current view.
    ///
    /// # Errors
    ///
    /// Fails if the backing trial cannot be read (e.g. deleted).
    fn status(&mut self) -> Result<TrialStatus>;

    /// The trial's parameters, interpreted as typed values through the
    /// study's configuration.
    ///
    /// # Errors
    ///
    /// Fails if the trial or study config cannot be read, or a stored
    /// value falls outside the configured search space.
    fn parameters(&mut self) -> Result<HashMap<String, ParamValue>>;

    /// Reports an intermediate measurement. Only legal while the trial
    /// is active.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-state condition on terminal trials, and
    /// with not-found after the trial or study was deleted.
    fn add_measurement(&mut self, measurement: Measurement) -> Result<()>;

    /// Completes the trial. See [`CompleteOutcome`] for the three legal
    /// argument shapes. Returns the final measurement, or `None` when
    /// the trial was marked infeasible.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument condition when completing with
    /// neither a measurement nor a reason and no intermediate
    /// measurement exists; with an invalid-state condition on an
    /// already-terminal trial.
    fn complete(&mut self, outcome: CompleteOutcome) -> Result<Option<Measurement>>;

    /// Polls the service's early-stopping policy. Advisory only: the
    /// answer does not mutate the trial and is not stable across calls.
    ///
    /// # Errors
    ///
    /// Fails if the backing trial cannot be read.
    fn should_stop(&mut self) -> Result<bool>;

    /// Deletes the trial on the service, consuming the handle.
    ///
    /// # Errors
    ///
    /// Fails with not-found if another process deleted it first.
    fn delete(self) -> Result<()>;

    /// Fetches a fresh, independent deep copy of the trial record.
    ///
    /// The final measurement (if any) is always included;
    /// `include_all_measurements` only controls whether the intermediate
    /// history is.
    ///
    /// # Errors
    ///
    /// Fails if the backing trial cannot be read.
    fn materialize(&mut self, include_all_measurements: bool) -> Result<TrialRecord>;
}

/// Operations on one optimization experiment.
pub trait StudyHandle {
    /// The concrete trial handle this backend produces.
    type Trial: TrialHandle;

    /// Requests up to `count` trials for this handle's worker identity.
    ///
    /// Still-active trials already assigned to the worker are returned
    /// preferentially; only the remaining deficit is freshly suggested.
    /// The service decides the actual count, which may be smaller (e.g.
    /// an exhausted finite search space) — an empty result is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Fails if the study cannot be read or suggestions cannot be minted.
    fn suggest(&self, count: usize) -> Result<Vec<Self::Trial>>;

    /// Lists trials, lazily applying `filter` when given.
    ///
    /// # Errors
    ///
    /// Fails if the study cannot be read.
    fn trials(&self, filter: Option<&TrialPredicate>) -> Result<Vec<Self::Trial>>;

    /// Fetches a single trial by uid.
    ///
    /// # Errors
    ///
    /// Fails with a not-found condition if no such trial exists.
    fn get_trial(&self, uid: u64) -> Result<Self::Trial>;

    /// Returns the Pareto-optimal (single-objective: best) trials as
    /// currently known to the service. Empty if nothing has completed.
    ///
    /// # Errors
    ///
    /// Fails if the study cannot be read.
    fn optimal_trials(&self) -> Result<Vec<Self::Trial>>;

    /// Returns a deep, independent copy of the study's configuration.
    ///
    /// # Errors
    ///
    /// Fails if the study cannot be read.
    fn materialize_study_config(&self) -> Result<StudyConfig>;

    /// Deletes the study and all its trials on the service, consuming
    /// the handle. Trial handles obtained earlier surface not-found on
    /// their next round-trip.
    ///
    /// # Errors
    ///
    /// Fails with not-found if the study was already deleted.
    fn delete(self) -> Result<()>;
}

/// How to complete a trial.
///
/// Three shapes are legal, mirroring the service's complete call:
///
/// - [`final_measurement`](Self::final_measurement): the given
///   measurement becomes final, the trial completes.
/// - [`infeasible`](Self::infeasible): the trial becomes infeasible; a
///   measurement may still be attached for diagnostics via
///   [`with_measurement`](Self::with_measurement).
/// - [`from_intermediates`](Self::from_intermediates): the service
///   promotes the most recent intermediate measurement; fails when none
///   exists.
#[derive(Clone, Debug, Default)]
pub struct CompleteOutcome {
    pub(crate) measurement: Option<Measurement>,
    pub(crate) infeasible_reason: Option<String>,
}

impl CompleteOutcome {
    /// Complete with an explicit final measurement.
    #[must_use]
    pub fn final_measurement(measurement: Measurement) -> Self {
        Self {
            measurement: Some(measurement),
            infeasible_reason: None,
        }
    }

    /// Mark the trial infeasible with the given reason.
    #[must_use]
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self {
            measurement: None,
            infeasible_reason: Some(reason.into()),
        }
    }

    /// Let the service pick the final measurement from the intermediate
    /// history.
    #[must_use]
    pub fn from_intermediates() -> Self {
        Self::default()
    }

    /// Attach a diagnostic measurement to an infeasible outcome.
    #[must_use]
    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }
}
