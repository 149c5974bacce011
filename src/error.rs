#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a referenced study or trial does not exist on the service.
    ///
    /// This is never swallowed: a handle whose backing resource was deleted
    /// by another process surfaces this error on its next round-trip.
    #[error("not found: {resource}")]
    NotFound {
        /// A human-readable description of the missing resource,
        /// e.g. `"study 'mnist-lr'"` or `"trial 7"`.
        resource: String,
    },

    /// Returned when an operation is given arguments the service cannot act
    /// on, e.g. completing a trial with neither a final measurement nor an
    /// infeasibility reason when no intermediate measurement exists to
    /// promote.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Returned when an operation is illegal in the trial's current
    /// lifecycle state, e.g. completing or measuring an already-terminal
    /// trial.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Returned when the underlying transport to the service fails.
    ///
    /// This crate adds no retry logic of its own; retries belong to the
    /// gateway implementation or an external policy wrapper.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub(crate) fn study_not_found(uid: &str) -> Self {
        Error::NotFound {
            resource: format!("study '{uid}'"),
        }
    }

    pub(crate) fn trial_not_found(uid: u64) -> Self {
        Error::NotFound {
            resource: format!("trial {uid}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
