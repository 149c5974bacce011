//! Raw trial records as exchanged with the service gateway.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;
use crate::types::TrialStatus;

/// A parameter value assigned by the service.
///
/// Values arrive already tagged by type; the study config re-validates
/// them against the search space when a trial's parameters are read
/// (see [`StudyConfig::trial_parameters`](crate::StudyConfig::trial_parameters)).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as the chosen category name.
    Categorical(String),
    /// A boolean parameter value.
    Bool(bool),
}

impl ParamValue {
    /// Returns the value as `f64` if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// The authoritative record of one trial, as stored by the service.
///
/// Client-side [`Trial`](crate::Trial) handles mirror one of these;
/// [`materialize`](crate::handle::TrialHandle::materialize) returns a
/// fresh, independent deep copy of it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialRecord {
    /// Unique integer id within the owning study, assigned by the service
    /// and never reassigned.
    pub uid: u64,
    /// Current lifecycle state.
    pub status: TrialStatus,
    /// The parameter assignment under evaluation, immutable after
    /// suggestion.
    pub parameters: HashMap<String, ParamValue>,
    /// Intermediate measurements in report order.
    pub measurements: Vec<Measurement>,
    /// The final measurement, present once the trial is `Completed`
    /// (and optionally, as a diagnostic, on `Infeasible` trials).
    pub final_measurement: Option<Measurement>,
    /// Why the trial was marked infeasible, if it was.
    pub infeasible_reason: Option<String>,
    /// The client id of the worker responsible for evaluating this trial,
    /// used for suggestion deduplication. `None` for trials minted without
    /// worker affinity.
    pub assigned_worker: Option<String>,
}

impl TrialRecord {
    /// Creates an `Active` record with the given uid and parameters and no
    /// measurements. This is the shape of a freshly minted suggestion.
    #[must_use]
    #[allow(clippy::implicit_hasher)]
    pub fn new(uid: u64, parameters: HashMap<String, ParamValue>) -> Self {
        Self {
            uid,
            status: TrialStatus::Active,
            parameters,
            measurements: Vec::new(),
            final_measurement: None,
            infeasible_reason: None,
            assigned_worker: None,
        }
    }

    /// Returns a copy of this record with `assigned_worker` set.
    #[must_use]
    pub fn assigned_to(mut self, worker: impl Into<String>) -> Self {
        self.assigned_worker = Some(worker.into());
        self
    }

    /// Returns `true` if this trial is assigned to `client_id` and still
    /// eligible for re-delivery to that worker (i.e. not terminal).
    #[must_use]
    pub fn is_assigned_active(&self, client_id: &str) -> bool {
        !self.status.is_terminal() && self.assigned_worker.as_deref() == Some(client_id)
    }
}
