#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Client-side Study/Trial abstraction for a hosted black-box
//! optimization service.
//!
//! Distributed worker processes use this crate to request parameter
//! suggestions for a *study* (one optimization experiment), evaluate
//! them, and report results back — without knowing whether the backing
//! service is local or remote. The service behind the
//! [`Gateway`](gateway::Gateway) boundary owns all authoritative state
//! and the suggestion algorithm; this crate owns the client-side
//! lifecycle protocol: suggestion deduplication across workers, the
//! trial state machine, and the consistency contract between a handle's
//! cached view and service truth.
//!
//! # Getting started
//!
//! ```
//! use optimizer_client::gateway::InMemoryService;
//! use optimizer_client::prelude::*;
//!
//! let service = InMemoryService::new();
//! let config = StudyConfig::new(
//!     vec![ParameterSpec::new("lr", ParameterDomain::Float { low: 1e-4, high: 0.1 })],
//!     vec![MetricSpec::new("loss", Direction::Minimize)],
//! );
//! service.create_study("tune-lr", config)?;
//!
//! let study = Study::connect(&service, "tune-lr", "worker-1")?;
//! for mut trial in study.suggest(2)? {
//!     let lr = trial.parameters()?["lr"].as_f64().unwrap();
//!     // ... evaluate with this learning rate, reporting progress ...
//!     trial.add_measurement(Measurement::new(10, [("loss", lr * 3.0)]))?;
//!     if trial.should_stop()? {
//!         trial.complete(CompleteOutcome::from_intermediates())?;
//!     } else {
//!         trial.complete(CompleteOutcome::final_measurement(Measurement::new(
//!             20,
//!             [("loss", lr * 2.0)],
//!         )))?;
//!     }
//! }
//! # Ok::<(), optimizer_client::Error>(())
//! ```
//!
//! # Core concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Study`] | Coordinator for one experiment: suggest, list, and query optimal trials. |
//! | [`Trial`] | Handle to one parameter assignment under evaluation, mirroring the service record. |
//! | [`Measurement`] | Immutable objective-value snapshot reported during or at the end of a trial. |
//! | [`StudyConfig`] | Search space + metric definitions; materialized snapshots only on the client. |
//! | [`Gateway`](gateway::Gateway) | Wire boundary to the service; implement it to plug in a transport. |
//!
//! # Consistency model
//!
//! Every operation is synchronous and may block on a service
//! round-trip. Handles are cheap proxies over a shared gateway; their
//! local mirrors go stale by design and are refreshed only at the
//! documented points (commands, explicit [`Trial::refresh`], and
//! [`Trial::materialize`]). Materialized values are always independent
//! deep copies.
//!
//! # Feature flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on the value objects | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key protocol points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod config;
mod error;
pub mod gateway;
pub mod handle;
mod measurement;
mod record;
mod study;
mod trial;
mod types;

pub use config::{MetricSpec, ParameterDomain, ParameterSpec, StudyConfig};
pub use error::{Error, Result};
pub use handle::{CompleteOutcome, StudyHandle, TrialHandle, TrialPredicate};
pub use measurement::Measurement;
pub use record::{ParamValue, TrialRecord};
pub use study::Study;
pub use trial::Trial;
pub use types::{Direction, TrialStatus};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use optimizer_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{MetricSpec, ParameterDomain, ParameterSpec, StudyConfig};
    pub use crate::error::{Error, Result};
    pub use crate::gateway::{Connector, Gateway, UNSET_CLIENT_ID};
    pub use crate::handle::{CompleteOutcome, StudyHandle, TrialHandle};
    pub use crate::measurement::Measurement;
    pub use crate::record::{ParamValue, TrialRecord};
    pub use crate::study::Study;
    pub use crate::trial::Trial;
    pub use crate::types::{Direction, TrialStatus};
}
