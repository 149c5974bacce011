//! Study coordinator: trial creation, listing, and optimal-trial queries
//! for one optimization experiment.

use std::sync::Arc;

use crate::config::StudyConfig;
use crate::error::Result;
use crate::gateway::{Connector, Gateway, UNSET_CLIENT_ID};
use crate::handle::{StudyHandle, TrialPredicate};
use crate::trial::Trial;

/// A handle to one optimization experiment hosted on the service.
///
/// The study is the factory for [`Trial`] handles: [`suggest`](Self::suggest)
/// requests parameter assignments for this handle's worker identity,
/// [`trials`](Self::trials) / [`get_trial`](Self::get_trial) look up
/// existing ones. All state lives on the service; the coordinator holds
/// only the shared gateway and its client id, so it is cheap to clone
/// mentally and safe to share read-only across threads.
///
/// Every method may block on a service round-trip; this layer defines no
/// timeout or retry semantics.
///
/// # Examples
///
/// ```
/// use optimizer_client::gateway::InMemoryService;
/// use optimizer_client::{
///     CompleteOutcome, Direction, Measurement, MetricSpec, ParameterDomain, ParameterSpec,
///     Study, StudyConfig,
/// };
///
/// let service = InMemoryService::new();
/// let config = StudyConfig::new(
///     vec![ParameterSpec::new("x", ParameterDomain::Float { low: -5.0, high: 5.0 })],
///     vec![MetricSpec::new("loss", Direction::Minimize)],
/// );
/// service.create_study("quadratic", config).unwrap();
///
/// let study = Study::connect(&service, "quadratic", "worker-1").unwrap();
/// for mut trial in study.suggest(3).unwrap() {
///     let x = trial.parameters().unwrap()["x"].as_f64().unwrap();
///     trial
///         .complete(CompleteOutcome::final_measurement(Measurement::new(
///             1,
///             [("loss", x * x)],
///         )))
///         .unwrap();
/// }
/// assert_eq!(study.optimal_trials().unwrap().len(), 1);
/// ```
pub struct Study<G: Gateway> {
    gateway: Arc<G>,
    client_id: String,
}

impl<G: Gateway> core::fmt::Debug for Study<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Study")
            .field("uid", &self.gateway.study_uid())
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl<G: Gateway> Study<G> {
    /// Wraps an already-bound gateway.
    ///
    /// `client_id` is the worker identity used by [`suggest`](Self::suggest)
    /// for deduplication; pass [`UNSET_CLIENT_ID`] for no worker affinity.
    #[must_use]
    pub fn new(gateway: G, client_id: impl Into<String>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            client_id: client_id.into(),
        }
    }

    /// Connects to an existing study on the service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no study
    /// with that uid exists.
    pub fn connect<C>(connector: &C, study_uid: &str, client_id: &str) -> Result<Self>
    where
        C: Connector<Gateway = G>,
    {
        Ok(Self::new(connector.connect(study_uid, client_id)?, client_id))
    }

    /// Reconnects to an existing study by uid, without worker affinity.
    ///
    /// Use [`connect`](Self::connect) instead when the handle will be
    /// used to request suggestions for a specific worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no study
    /// with that uid exists.
    pub fn from_uid<C>(connector: &C, uid: &str) -> Result<Self>
    where
        C: Connector<Gateway = G>,
    {
        Self::connect(connector, uid, UNSET_CLIENT_ID)
    }

    /// The uid of this study.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.gateway.study_uid()
    }

    /// The worker identity this handle suggests for.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Requests up to `count` trials for this handle's worker identity.
    ///
    /// Equivalent to [`suggest_for`](Self::suggest_for) with the handle's
    /// own client id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was deleted; transport errors propagate unchanged.
    pub fn suggest(&self, count: usize) -> Result<Vec<Trial<G>>> {
        self.suggest_for(count, &self.client_id)
    }

    /// Requests up to `count` trials for an explicit worker identity.
    ///
    /// Still-active trials already assigned to `client_id` are returned
    /// preferentially (capped at `count`); only the remaining deficit is
    /// satisfied with freshly minted suggestions. The lookup is skipped
    /// for [`UNSET_CLIENT_ID`], which carries no affinity. Deduplication
    /// is best-effort against the state the service reports at call
    /// time: two concurrent calls for the same worker may both mint new
    /// trials, and the service remains the arbiter of uniqueness.
    ///
    /// The returned handles are pre-seeded with the suggested records.
    /// Fewer than `count` trials (possibly none) are returned when the
    /// search space is exhausted; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was deleted; transport errors propagate unchanged.
    pub fn suggest_for(&self, count: usize, client_id: &str) -> Result<Vec<Trial<G>>> {
        let mut records = Vec::with_capacity(count);
        if client_id != UNSET_CLIENT_ID {
            records.extend(
                self.gateway
                    .list_trials()?
                    .into_iter()
                    .filter(|t| t.is_assigned_active(client_id))
                    .take(count),
            );
        }
        let reused = records.len();
        if reused < count {
            records.extend(self.gateway.get_suggestions(count - reused, client_id)?);
        }
        trace_debug!(
            study = %self.uid(),
            client_id,
            reused,
            minted = records.len() - reused,
            "suggest"
        );
        Ok(records
            .into_iter()
            .map(|r| Trial::from_record(Arc::clone(&self.gateway), r))
            .collect())
    }

    /// Lists the study's trials, applying `filter` when given; a trial
    /// failing the predicate is simply excluded.
    ///
    /// The returned handles are pre-seeded with the records as listed
    /// (cache-on-construction): reads on them serve that snapshot until
    /// an explicit refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was deleted.
    pub fn trials(&self, filter: Option<&TrialPredicate>) -> Result<Vec<Trial<G>>> {
        Ok(self
            .gateway
            .list_trials()?
            .into_iter()
            .filter(|record| filter.is_none_or(|pred| pred(record)))
            .map(|record| Trial::from_record(Arc::clone(&self.gateway), record))
            .collect())
    }

    /// Fetches a single trial by uid, verifying it exists on the service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no trial
    /// with that uid exists in the study.
    pub fn get_trial(&self, uid: u64) -> Result<Trial<G>> {
        let record = self.gateway.get_trial(uid)?;
        Ok(Trial::from_record(Arc::clone(&self.gateway), record))
    }

    /// Returns the Pareto-optimal (single-objective: best) trials as
    /// currently known to the service. Empty if no trial has completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was deleted.
    pub fn optimal_trials(&self) -> Result<Vec<Trial<G>>> {
        Ok(self
            .gateway
            .list_optimal_trials()?
            .into_iter()
            .map(|record| Trial::from_record(Arc::clone(&self.gateway), record))
            .collect())
    }

    /// Returns a deep, independent copy of the study's search-space and
    /// metric configuration; mutating it never affects the service or
    /// other callers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was deleted.
    pub fn materialize_study_config(&self) -> Result<StudyConfig> {
        self.gateway.get_study_config()
    }

    /// Deletes the study and all its trials on the service, consuming
    /// the coordinator.
    ///
    /// [`Trial`] handles obtained earlier surface
    /// [`Error::NotFound`](crate::Error::NotFound) on their next
    /// round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the study
    /// was already deleted.
    pub fn delete(self) -> Result<()> {
        self.gateway.delete_study()
    }
}

impl<G: Gateway> StudyHandle for Study<G> {
    type Trial = Trial<G>;

    fn suggest(&self, count: usize) -> Result<Vec<Trial<G>>> {
        Study::suggest(self, count)
    }

    fn trials(&self, filter: Option<&TrialPredicate>) -> Result<Vec<Trial<G>>> {
        Study::trials(self, filter)
    }

    fn get_trial(&self, uid: u64) -> Result<Trial<G>> {
        Study::get_trial(self, uid)
    }

    fn optimal_trials(&self) -> Result<Vec<Trial<G>>> {
        Study::optimal_trials(self)
    }

    fn materialize_study_config(&self) -> Result<StudyConfig> {
        Study::materialize_study_config(self)
    }

    fn delete(self) -> Result<()> {
        Study::delete(self)
    }
}
