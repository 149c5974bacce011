//! Measurement value objects.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One objective-value snapshot reported for a trial.
///
/// A measurement is immutable once constructed: a trial accumulates many
/// of them over its life, but each individual measurement never changes.
/// `steps` is a monotonic progress counter chosen by the worker (e.g.
/// training steps or epochs); `elapsed_secs` is wall-clock time since the
/// trial started.
///
/// # Examples
///
/// ```
/// use optimizer_client::Measurement;
///
/// let m = Measurement::new(100, [("loss", 0.25)]).with_elapsed_secs(12.5);
/// assert_eq!(m.steps(), 100);
/// assert_eq!(m.metric("loss"), Some(0.25));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    steps: u64,
    elapsed_secs: f64,
    metrics: HashMap<String, f64>,
}

impl Measurement {
    /// Creates a measurement at the given progress counter with the given
    /// metric values. `elapsed_secs` defaults to zero; set it with
    /// [`with_elapsed_secs`](Self::with_elapsed_secs).
    #[must_use]
    pub fn new<K, I>(steps: u64, metrics: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            steps,
            elapsed_secs: 0.0,
            metrics: metrics.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns a copy of this measurement with the elapsed wall-clock time set.
    #[must_use]
    pub fn with_elapsed_secs(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = elapsed_secs;
        self
    }

    /// The worker's progress counter at the time of this measurement.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Wall-clock seconds elapsed since the trial started.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// All metric values, keyed by metric name.
    #[must_use]
    pub fn metrics(&self) -> &HashMap<String, f64> {
        &self.metrics
    }

    /// The value of a single metric, if reported.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
