//! Service gateway boundary.
//!
//! The [`Gateway`] trait is this crate's seam to the optimization
//! service: suggestion generation, trial storage, and early-stopping
//! decisions all live behind it. Every [`Study`](crate::Study) holds an
//! `Arc<G>` so a gateway is transparently shared by the coordinator and
//! all [`Trial`](crate::Trial) handles it produces.
//!
//! A gateway is conceptually bound to one `(service endpoint, study uid,
//! client id)` triple. Implementations perform (possibly remote,
//! blocking) request/response exchanges; no call may be assumed to
//! return within bounded time, and none of them retries — transport
//! failures surface as [`Error::Unavailable`](crate::Error::Unavailable)
//! and propagate unchanged.
//!
//! # Available backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`InMemoryService`] | Process-local service with uniform-random suggestions, for local runs and tests |
//!
//! A remote (e.g. gRPC) gateway is an external collaborator: implement
//! [`Gateway`] and [`Connector`] over your transport and the client core
//! works unchanged.

mod memory;

pub use memory::{InMemoryGateway, InMemoryService, StopRule};

use crate::config::StudyConfig;
use crate::error::Result;
use crate::measurement::Measurement;
use crate::record::TrialRecord;

/// Client id sentinel meaning "no worker affinity".
///
/// Suggestions requested under this id are not deduplicated against
/// previously assigned trials.
pub const UNSET_CLIENT_ID: &str = "";

/// Wire-level operations against one study on the optimization service.
///
/// Implementations must be `Send + Sync`: a gateway is shared via `Arc`
/// across every trial handle of a study, possibly from several threads.
/// The service behind the gateway is the single source of truth for all
/// study and trial state; the client core only caches.
pub trait Gateway: Send + Sync {
    /// The uid of the study this gateway is bound to.
    fn study_uid(&self) -> &str;

    /// Mint up to `count` fresh suggestions assigned to `client_id`.
    ///
    /// The service decides the actual count, which may be less than
    /// requested (e.g. a finite search space has been exhausted). An
    /// empty result is not an error.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study was
    /// deleted; transport failures as
    /// [`Error::Unavailable`](crate::Error::Unavailable).
    fn get_suggestions(&self, count: usize, client_id: &str) -> Result<Vec<TrialRecord>>;

    /// List every trial in the study.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study was
    /// deleted.
    fn list_trials(&self) -> Result<Vec<TrialRecord>>;

    /// Fetch a single trial record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if no trial with that
    /// uid exists.
    fn get_trial(&self, uid: u64) -> Result<TrialRecord>;

    /// List the Pareto-optimal (single-objective: best) completed trials.
    /// Empty if no trial has completed.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study was
    /// deleted.
    fn list_optimal_trials(&self) -> Result<Vec<TrialRecord>>;

    /// Fetch the study's configuration.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study was
    /// deleted.
    fn get_study_config(&self) -> Result<StudyConfig>;

    /// Complete the trial, making it terminal.
    ///
    /// See [`Trial::complete`](crate::Trial::complete) for the full
    /// semantics of the `measurement` / `infeasible_reason` combinations.
    /// Returns the updated record.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::Error::InvalidState) on terminal
    /// trials; [`Error::InvalidArgument`](crate::Error::InvalidArgument)
    /// when neither argument is given and no intermediate measurement
    /// exists; [`Error::NotFound`](crate::Error::NotFound) for unknown
    /// trials.
    fn complete_trial(
        &self,
        uid: u64,
        measurement: Option<Measurement>,
        infeasible_reason: Option<String>,
    ) -> Result<TrialRecord>;

    /// Append an intermediate measurement to an active trial.
    /// Returns the updated record.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::Error::InvalidState) on terminal
    /// trials; [`Error::NotFound`](crate::Error::NotFound) for unknown
    /// trials.
    fn report_intermediate_objective_value(
        &self,
        uid: u64,
        measurement: Measurement,
    ) -> Result<TrialRecord>;

    /// Ask the service's early-stopping policy whether the trial should
    /// stop. Advisory only; not stable across calls.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) for unknown trials.
    fn should_trial_stop(&self, uid: u64) -> Result<bool>;

    /// Ask the service to flag an active trial as requested-to-stop.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::Error::InvalidState) on terminal
    /// trials; [`Error::NotFound`](crate::Error::NotFound) for unknown
    /// trials.
    fn stop_trial(&self, uid: u64) -> Result<()>;

    /// Remove one trial from the service.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) for unknown trials.
    fn delete_trial(&self, uid: u64) -> Result<()>;

    /// Delete the whole study and all its trials. Every later call
    /// through any gateway bound to this study fails with
    /// [`Error::NotFound`](crate::Error::NotFound).
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study was
    /// already deleted.
    fn delete_study(&self) -> Result<()>;
}

/// Connects client ids to studies hosted on a service.
///
/// This is the reconnect path: given a study uid and a worker identity,
/// produce a bound [`Gateway`]. Implemented by [`InMemoryService`]; a
/// remote implementation would carry the service endpoint address.
pub trait Connector {
    /// The gateway type this connector produces.
    type Gateway: Gateway;

    /// Binds a gateway to an existing study.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the study does not
    /// exist on the service.
    fn connect(&self, study_uid: &str, client_id: &str) -> Result<Self::Gateway>;
}
