//! Trial handle: the client-side view of one trial.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StudyConfig;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::handle::{CompleteOutcome, TrialHandle};
use crate::measurement::Measurement;
use crate::record::{ParamValue, TrialRecord};
use crate::types::TrialStatus;

/// A handle to one trial hosted on the service.
///
/// The handle is a cheap proxy: the service owns the authoritative
/// record and this type only mirrors it. The staleness contract is
/// fixed and narrow:
///
/// - **Commands** ([`complete`](Self::complete),
///   [`add_measurement`](Self::add_measurement)) round-trip to the
///   service and replace the local mirror with the record the service
///   returns.
/// - **Reads** ([`status`](Self::status), [`parameters`](Self::parameters))
///   serve the last-fetched snapshot, fetching one on first use. They
///   never refresh implicitly after that; call [`refresh`](Self::refresh)
///   or [`materialize`](Self::materialize) for fresh truth.
/// - [`materialize`](Self::materialize) always re-fetches.
///
/// The study config used by [`parameters`](Self::parameters) is fetched
/// once per handle lifetime and cached thereafter.
///
/// A handle is not internally synchronized: share it read-only across
/// threads or wrap it yourself. A trial deleted concurrently by another
/// process surfaces as [`Error::NotFound`] on the next round-trip.
pub struct Trial<G: Gateway> {
    gateway: Arc<G>,
    uid: u64,
    mirror: Option<TrialRecord>,
    study_config: Option<StudyConfig>,
}

impl<G: Gateway> core::fmt::Debug for Trial<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trial")
            .field("uid", &self.uid)
            .field("study", &self.gateway.study_uid())
            .field("mirror", &self.mirror)
            .field("has_study_config", &self.study_config.is_some())
            .finish()
    }
}

impl<G: Gateway> Trial<G> {
    /// Handle pre-seeded with a record the study coordinator just
    /// fetched (cache-on-construction).
    pub(crate) fn from_record(gateway: Arc<G>, record: TrialRecord) -> Self {
        Self {
            uid: record.uid,
            gateway,
            mirror: Some(record),
            study_config: None,
        }
    }

    /// Unique identifier of the trial within its study.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Re-fetches the mirror from the service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the trial or its study was deleted.
    pub fn refresh(&mut self) -> Result<()> {
        self.mirror = Some(self.gateway.get_trial(self.uid)?);
        Ok(())
    }

    fn mirror(&mut self) -> Result<&TrialRecord> {
        if self.mirror.is_none() {
            self.refresh()?;
        }
        self.mirror
            .as_ref()
            .ok_or_else(|| Error::trial_not_found(self.uid))
    }

    fn ensure_config(&mut self) -> Result<()> {
        if self.study_config.is_none() {
            self.study_config = Some(self.gateway.get_study_config()?);
        }
        Ok(())
    }

    /// The trial's lifecycle state, from the last-fetched snapshot
    /// (fetched on first use).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the trial cannot be read.
    pub fn status(&mut self) -> Result<TrialStatus> {
        Ok(self.mirror()?.status)
    }

    /// The trial's parameters, typed through the study configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the trial or config cannot be
    /// read, or [`Error::InvalidArgument`] if a stored value falls
    /// outside the configured search space.
    pub fn parameters(&mut self) -> Result<HashMap<String, ParamValue>> {
        if self.mirror.is_none() {
            self.refresh()?;
        }
        self.ensure_config()?;
        // Both caches are filled above; borrow them together now.
        let record = self
            .mirror
            .as_ref()
            .ok_or_else(|| Error::trial_not_found(self.uid))?;
        let config = self
            .study_config
            .as_ref()
            .ok_or_else(|| Error::study_not_found(self.gateway.study_uid()))?;
        config.trial_parameters(record)
    }

    /// Reports an intermediate measurement, appending it to the trial's
    /// history on the service; the mirror is updated from the service
    /// response, so report order is preserved locally as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] on terminal trials and
    /// [`Error::NotFound`] if the trial was deleted.
    pub fn add_measurement(&mut self, measurement: Measurement) -> Result<()> {
        let record = self
            .gateway
            .report_intermediate_objective_value(self.uid, measurement)?;
        self.mirror = Some(record);
        Ok(())
    }

    /// Completes the trial.
    ///
    /// Returns the final measurement, or `None` when the trial was
    /// marked infeasible. If the local mirror already shows a terminal
    /// status the call fails without a round-trip; terminal
    /// re-completion is never idempotent in this client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] on an already-terminal trial, and
    /// [`Error::InvalidArgument`] when completing with neither a
    /// measurement nor a reason while no intermediate measurement exists.
    pub fn complete(&mut self, outcome: CompleteOutcome) -> Result<Option<Measurement>> {
        if let Some(record) = &self.mirror {
            if record.status.is_terminal() {
                return Err(Error::InvalidState(format!(
                    "trial {} is already {:?}",
                    self.uid, record.status
                )));
            }
        }
        let record = self.gateway.complete_trial(
            self.uid,
            outcome.measurement,
            outcome.infeasible_reason,
        )?;
        let result = if record.status == TrialStatus::Infeasible {
            None
        } else {
            record.final_measurement.clone()
        };
        self.mirror = Some(record);
        Ok(result)
    }

    /// Polls the service's early-stopping policy for this trial.
    ///
    /// Advisory only: the answer mutates nothing locally and must not be
    /// assumed stable across calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the trial cannot be read.
    pub fn should_stop(&mut self) -> Result<bool> {
        self.gateway.should_trial_stop(self.uid)
    }

    /// Deletes the trial on the service, consuming the handle.
    ///
    /// Other handles to the same trial fail with [`Error::NotFound`] on
    /// their next round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if another process deleted it first.
    pub fn delete(self) -> Result<()> {
        self.gateway.delete_trial(self.uid)
    }

    /// Fetches fresh service truth and returns it as an independent deep
    /// copy, also updating the mirror.
    ///
    /// The final measurement (if any) is always included;
    /// `include_all_measurements` only controls whether the intermediate
    /// history is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the trial cannot be read.
    pub fn materialize(&mut self, include_all_measurements: bool) -> Result<TrialRecord> {
        self.refresh()?;
        let mut record = self.mirror()?.clone();
        if !include_all_measurements {
            record.measurements.clear();
        }
        Ok(record)
    }
}

impl<G: Gateway> TrialHandle for Trial<G> {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn status(&mut self) -> Result<TrialStatus> {
        Trial::status(self)
    }

    fn parameters(&mut self) -> Result<HashMap<String, ParamValue>> {
        Trial::parameters(self)
    }

    fn add_measurement(&mut self, measurement: Measurement) -> Result<()> {
        Trial::add_measurement(self, measurement)
    }

    fn complete(&mut self, outcome: CompleteOutcome) -> Result<Option<Measurement>> {
        Trial::complete(self, outcome)
    }

    fn should_stop(&mut self) -> Result<bool> {
        Trial::should_stop(self)
    }

    fn delete(self) -> Result<()> {
        Trial::delete(self)
    }

    fn materialize(&mut self, include_all_measurements: bool) -> Result<TrialRecord> {
        Trial::materialize(self, include_all_measurements)
    }
}
