//! Process-local service backend.
//!
//! [`InMemoryService`] hosts any number of studies in the current
//! process and hands out [`InMemoryGateway`] bindings through the
//! [`Connector`] trait. It is the authoritative state holder: trial ids,
//! the trial state machine, and optimal-trial queries are all decided
//! here, exactly as a remote service would decide them. Suggestions are
//! sampled uniformly from the search space; anything smarter is the
//! service's business, not this crate's.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{Connector, Gateway};
use crate::config::{ParameterDomain, StudyConfig};
use crate::error::{Error, Result};
use crate::measurement::Measurement;
use crate::record::{ParamValue, TrialRecord};
use crate::types::{Direction, TrialStatus};

/// Early-stopping policy hook for one study.
///
/// Called by [`Gateway::should_trial_stop`] with the trial's current
/// record; returning `true` advises the assigned worker to stop.
pub type StopRule = Box<dyn Fn(&TrialRecord) -> bool + Send + Sync>;

struct StudyState {
    config: StudyConfig,
    trials: RwLock<Vec<TrialRecord>>,
    // Trial uids start at 1; 0 is never assigned.
    next_uid: AtomicU64,
    rng: Mutex<fastrand::Rng>,
    max_trials: RwLock<Option<usize>>,
    stop_rule: RwLock<Option<StopRule>>,
    deleted: AtomicBool,
}

impl StudyState {
    fn new(config: StudyConfig) -> Self {
        Self {
            config,
            trials: RwLock::new(Vec::new()),
            next_uid: AtomicU64::new(1),
            rng: Mutex::new(fastrand::Rng::new()),
            max_trials: RwLock::new(None),
            stop_rule: RwLock::new(None),
            deleted: AtomicBool::new(false),
        }
    }

    fn sample_parameters(&self) -> HashMap<String, ParamValue> {
        let mut rng = self.rng.lock();
        self.config
            .parameters
            .iter()
            .map(|spec| {
                let value = match &spec.domain {
                    ParameterDomain::Float { low, high } => {
                        ParamValue::Float(low + rng.f64() * (high - low))
                    }
                    ParameterDomain::Int { low, high } => ParamValue::Int(rng.i64(*low..=*high)),
                    ParameterDomain::Categorical { choices } => {
                        ParamValue::Categorical(choices[rng.usize(..choices.len())].clone())
                    }
                    ParameterDomain::Bool => ParamValue::Bool(rng.bool()),
                };
                (spec.name.clone(), value)
            })
            .collect()
    }
}

type Registry = Arc<RwLock<HashMap<String, Arc<StudyState>>>>;

/// A process-local optimization service.
///
/// Cloning is cheap and every clone shares the same study registry, so a
/// service can be handed to several worker threads. Suggestion
/// generation is uniform-random over the search space.
///
/// # Examples
///
/// ```
/// use optimizer_client::gateway::{Connector, InMemoryService};
/// use optimizer_client::{Direction, MetricSpec, ParameterDomain, ParameterSpec, StudyConfig};
///
/// let service = InMemoryService::new();
/// let config = StudyConfig::new(
///     vec![ParameterSpec::new("x", ParameterDomain::Float { low: 0.0, high: 1.0 })],
///     vec![MetricSpec::new("loss", Direction::Minimize)],
/// );
/// service.create_study("demo", config).unwrap();
/// let gateway = service.connect("demo", "worker-1").unwrap();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryService {
    studies: Registry,
}

impl InMemoryService {
    /// Creates a service hosting no studies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a study, or loads it if it already exists.
    ///
    /// Create-or-load is intentional: in a distributed run many workers
    /// race to create the same study, and all of them must end up
    /// pointing at a single instance. When the study already exists its
    /// stored configuration wins and `config` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a brand-new `config` fails
    /// [`StudyConfig::validate`].
    pub fn create_study(&self, uid: impl Into<String>, config: StudyConfig) -> Result<()> {
        let uid = uid.into();
        let mut studies = self.studies.write();
        if studies.contains_key(&uid) {
            return Ok(());
        }
        config.validate()?;
        studies.insert(uid, Arc::new(StudyState::new(config)));
        Ok(())
    }

    /// Caps the total number of trials the study will ever mint.
    ///
    /// Once the cap is reached, `get_suggestions` returns fewer trials
    /// than requested (possibly none), modelling an exhausted search
    /// space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the study does not exist.
    pub fn set_max_trials(&self, study_uid: &str, cap: usize) -> Result<()> {
        *self.state(study_uid)?.max_trials.write() = Some(cap);
        Ok(())
    }

    /// Installs the study's early-stopping rule, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the study does not exist.
    pub fn set_stop_rule(
        &self,
        study_uid: &str,
        rule: impl Fn(&TrialRecord) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        *self.state(study_uid)?.stop_rule.write() = Some(Box::new(rule));
        Ok(())
    }

    /// Seeds the study's suggestion sampler, for reproducible tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the study does not exist.
    pub fn seed_rng(&self, study_uid: &str, seed: u64) -> Result<()> {
        *self.state(study_uid)?.rng.lock() = fastrand::Rng::with_seed(seed);
        Ok(())
    }

    fn state(&self, study_uid: &str) -> Result<Arc<StudyState>> {
        self.studies
            .read()
            .get(study_uid)
            .cloned()
            .ok_or_else(|| Error::study_not_found(study_uid))
    }
}

impl Connector for InMemoryService {
    type Gateway = InMemoryGateway;

    fn connect(&self, study_uid: &str, client_id: &str) -> Result<InMemoryGateway> {
        let state = self.state(study_uid)?;
        Ok(InMemoryGateway {
            registry: Arc::clone(&self.studies),
            state,
            study_uid: study_uid.to_owned(),
            client_id: client_id.to_owned(),
        })
    }
}

/// A [`Gateway`] bound to one study hosted by an [`InMemoryService`].
pub struct InMemoryGateway {
    registry: Registry,
    state: Arc<StudyState>,
    study_uid: String,
    client_id: String,
}

impl InMemoryGateway {
    /// The worker identity this gateway was connected with.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn live_state(&self) -> Result<&StudyState> {
        if self.state.deleted.load(Ordering::SeqCst) {
            return Err(Error::study_not_found(&self.study_uid));
        }
        Ok(&self.state)
    }

    fn find_mut(trials: &mut [TrialRecord], uid: u64) -> Result<&mut TrialRecord> {
        trials
            .iter_mut()
            .find(|t| t.uid == uid)
            .ok_or_else(|| Error::trial_not_found(uid))
    }
}

impl Gateway for InMemoryGateway {
    fn study_uid(&self) -> &str {
        &self.study_uid
    }

    fn get_suggestions(&self, count: usize, client_id: &str) -> Result<Vec<TrialRecord>> {
        let state = self.live_state()?;
        let mut trials = state.trials.write();

        let budget = match *state.max_trials.read() {
            Some(cap) => cap.saturating_sub(trials.len()).min(count),
            None => count,
        };

        let mut minted = Vec::with_capacity(budget);
        for _ in 0..budget {
            let uid = state.next_uid.fetch_add(1, Ordering::SeqCst);
            let mut record = TrialRecord::new(uid, state.sample_parameters());
            if client_id != super::UNSET_CLIENT_ID {
                record = record.assigned_to(client_id);
            }
            trace_debug!(study = %self.study_uid, trial = uid, "minted suggestion");
            trials.push(record.clone());
            minted.push(record);
        }
        Ok(minted)
    }

    fn list_trials(&self) -> Result<Vec<TrialRecord>> {
        Ok(self.live_state()?.trials.read().clone())
    }

    fn get_trial(&self, uid: u64) -> Result<TrialRecord> {
        self.live_state()?
            .trials
            .read()
            .iter()
            .find(|t| t.uid == uid)
            .cloned()
            .ok_or_else(|| Error::trial_not_found(uid))
    }

    fn list_optimal_trials(&self) -> Result<Vec<TrialRecord>> {
        let state = self.live_state()?;
        let trials = state.trials.read();
        Ok(pareto_optimal(&trials, &state.config))
    }

    fn get_study_config(&self) -> Result<StudyConfig> {
        Ok(self.live_state()?.config.clone())
    }

    fn complete_trial(
        &self,
        uid: u64,
        measurement: Option<Measurement>,
        infeasible_reason: Option<String>,
    ) -> Result<TrialRecord> {
        let state = self.live_state()?;
        let mut trials = state.trials.write();
        let record = Self::find_mut(&mut trials, uid)?;
        if record.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "trial {uid} is already {:?}",
                record.status
            )));
        }

        match (measurement, infeasible_reason) {
            (measurement, Some(reason)) => {
                // An accompanying measurement is kept as a diagnostic only.
                record.status = TrialStatus::Infeasible;
                record.infeasible_reason = Some(reason);
                record.final_measurement = measurement;
            }
            (Some(m), None) => {
                record.status = TrialStatus::Completed;
                record.final_measurement = Some(m);
            }
            (None, None) => {
                // Promote the most recent intermediate measurement.
                let Some(last) = record.measurements.last().cloned() else {
                    return Err(Error::InvalidArgument(format!(
                        "trial {uid} has no measurements and no infeasible reason"
                    )));
                };
                record.status = TrialStatus::Completed;
                record.final_measurement = Some(last);
            }
        }
        trace_info!(study = %self.study_uid, trial = uid, status = ?record.status, "trial completed");
        Ok(record.clone())
    }

    fn report_intermediate_objective_value(
        &self,
        uid: u64,
        measurement: Measurement,
    ) -> Result<TrialRecord> {
        let state = self.live_state()?;
        let mut trials = state.trials.write();
        let record = Self::find_mut(&mut trials, uid)?;
        if record.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "cannot add a measurement to trial {uid}: already {:?}",
                record.status
            )));
        }
        if let Some(last) = record.measurements.last() {
            if measurement.steps() < last.steps() {
                trace_debug!(
                    trial = uid,
                    steps = measurement.steps(),
                    "non-monotone step counter"
                );
            }
        }
        record.measurements.push(measurement);
        Ok(record.clone())
    }

    fn should_trial_stop(&self, uid: u64) -> Result<bool> {
        let state = self.live_state()?;
        let trials = state.trials.read();
        let record = trials
            .iter()
            .find(|t| t.uid == uid)
            .ok_or_else(|| Error::trial_not_found(uid))?;
        if record.status.is_terminal() {
            return Ok(false);
        }
        if record.status == TrialStatus::RequestedToStop {
            return Ok(true);
        }
        Ok(state.stop_rule.read().as_ref().is_some_and(|rule| rule(record)))
    }

    fn stop_trial(&self, uid: u64) -> Result<()> {
        let state = self.live_state()?;
        let mut trials = state.trials.write();
        let record = Self::find_mut(&mut trials, uid)?;
        if record.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "cannot request stop for trial {uid}: already {:?}",
                record.status
            )));
        }
        record.status = TrialStatus::RequestedToStop;
        Ok(())
    }

    fn delete_trial(&self, uid: u64) -> Result<()> {
        let state = self.live_state()?;
        let mut trials = state.trials.write();
        let before = trials.len();
        trials.retain(|t| t.uid != uid);
        if trials.len() == before {
            return Err(Error::trial_not_found(uid));
        }
        Ok(())
    }

    fn delete_study(&self) -> Result<()> {
        // The flag keeps gateways that still hold the Arc honest.
        self.live_state()?.deleted.store(true, Ordering::SeqCst);
        self.registry.write().remove(&self.study_uid);
        trace_info!(study = %self.study_uid, "study deleted");
        Ok(())
    }
}

/// Objective vector of a completed trial, in config metric order.
/// `None` if the trial is not completed or a metric is missing.
fn objective_vector(record: &TrialRecord, config: &StudyConfig) -> Option<Vec<f64>> {
    if record.status != TrialStatus::Completed {
        return None;
    }
    let measurement = record.final_measurement.as_ref()?;
    config
        .metrics
        .iter()
        .map(|m| measurement.metric(&m.name))
        .collect()
}

/// Returns `true` if `a` Pareto-dominates `b`: at least as good in every
/// metric and strictly better in one, respecting each metric's goal.
fn dominates(a: &[f64], b: &[f64], goals: &[Direction]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), goals.len());

    let mut strictly_better = false;
    for ((&av, &bv), goal) in a.iter().zip(b.iter()).zip(goals.iter()) {
        let (better, worse) = match goal {
            Direction::Minimize => (av < bv, av > bv),
            Direction::Maximize => (av > bv, av < bv),
        };
        if worse {
            return false;
        }
        if better {
            strictly_better = true;
        }
    }
    strictly_better
}

fn pareto_optimal(trials: &[TrialRecord], config: &StudyConfig) -> Vec<TrialRecord> {
    let goals: Vec<Direction> = config.metrics.iter().map(|m| m.goal).collect();
    let scored: Vec<(&TrialRecord, Vec<f64>)> = trials
        .iter()
        .filter_map(|t| objective_vector(t, config).map(|v| (t, v)))
        .collect();

    scored
        .iter()
        .filter(|(_, values)| {
            !scored
                .iter()
                .any(|(_, other)| dominates(other, values, &goals))
        })
        .map(|(t, _)| (*t).clone())
        .collect()
}
