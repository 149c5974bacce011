//! Study configuration: search space and metric definitions.
//!
//! The service owns the authoritative copy of a study's configuration;
//! the client only ever holds materialized snapshots of it. The one
//! behavior the client core relies on is
//! [`StudyConfig::trial_parameters`], which interprets the raw values
//! stored on a [`TrialRecord`] against the search space.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{ParamValue, TrialRecord};
use crate::types::Direction;

/// The domain a single parameter is drawn from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParameterDomain {
    /// A continuous value in `[low, high]`.
    Float {
        /// Lower bound, inclusive.
        low: f64,
        /// Upper bound, inclusive.
        high: f64,
    },
    /// An integer value in `[low, high]`.
    Int {
        /// Lower bound, inclusive.
        low: i64,
        /// Upper bound, inclusive.
        high: i64,
    },
    /// One of a fixed set of named categories.
    Categorical {
        /// The category names. Must be non-empty.
        choices: Vec<String>,
    },
    /// A boolean flag.
    Bool,
}

/// One named parameter of the search space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterSpec {
    /// Parameter name, unique within the study.
    pub name: String,
    /// The domain values are drawn from.
    pub domain: ParameterDomain,
}

impl ParameterSpec {
    /// Creates a named parameter spec.
    #[must_use]
    pub fn new(name: impl Into<String>, domain: ParameterDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    /// Checks that `value` lies within this parameter's domain.
    fn accepts(&self, value: &ParamValue) -> bool {
        match (&self.domain, value) {
            (ParameterDomain::Float { low, high }, ParamValue::Float(v)) => {
                (*low..=*high).contains(v)
            }
            (ParameterDomain::Int { low, high }, ParamValue::Int(v)) => (*low..=*high).contains(v),
            (ParameterDomain::Categorical { choices }, ParamValue::Categorical(c)) => {
                choices.contains(c)
            }
            (ParameterDomain::Bool, ParamValue::Bool(_)) => true,
            _ => false,
        }
    }
}

/// One named metric the study optimizes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricSpec {
    /// Metric name, unique within the study.
    pub name: String,
    /// Whether this metric is minimized or maximized.
    pub goal: Direction,
}

impl MetricSpec {
    /// Creates a named metric spec.
    #[must_use]
    pub fn new(name: impl Into<String>, goal: Direction) -> Self {
        Self {
            name: name.into(),
            goal,
        }
    }
}

/// A study's search space and metric definitions.
///
/// `StudyConfig` is a plain value object: cloning it yields a fully
/// independent deep copy, so mutating a materialized config never
/// affects the service or other callers.
///
/// # Examples
///
/// ```
/// use optimizer_client::{Direction, MetricSpec, ParameterDomain, ParameterSpec, StudyConfig};
///
/// let config = StudyConfig::new(
///     vec![
///         ParameterSpec::new("lr", ParameterDomain::Float { low: 1e-5, high: 1.0 }),
///         ParameterSpec::new("layers", ParameterDomain::Int { low: 1, high: 8 }),
///     ],
///     vec![MetricSpec::new("accuracy", Direction::Maximize)],
/// );
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudyConfig {
    /// The search space.
    pub parameters: Vec<ParameterSpec>,
    /// The metrics to optimize. Must be non-empty.
    pub metrics: Vec<MetricSpec>,
}

impl StudyConfig {
    /// Creates a study config from parameter and metric specs.
    #[must_use]
    pub fn new(parameters: Vec<ParameterSpec>, metrics: Vec<MetricSpec>) -> Self {
        Self {
            parameters,
            metrics,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if bounds are inverted, a
    /// categorical domain has no choices, a parameter or metric name is
    /// duplicated, or no metric is defined.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(Error::InvalidArgument(
                "study config must define at least one metric".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.parameters {
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate parameter name '{}'",
                    spec.name
                )));
            }
            match &spec.domain {
                ParameterDomain::Float { low, high } if low > high => {
                    return Err(Error::InvalidArgument(format!(
                        "parameter '{}': low ({low}) must not exceed high ({high})",
                        spec.name
                    )));
                }
                ParameterDomain::Int { low, high } if low > high => {
                    return Err(Error::InvalidArgument(format!(
                        "parameter '{}': low ({low}) must not exceed high ({high})",
                        spec.name
                    )));
                }
                ParameterDomain::Categorical { choices } if choices.is_empty() => {
                    return Err(Error::InvalidArgument(format!(
                        "parameter '{}': categorical choices cannot be empty",
                        spec.name
                    )));
                }
                _ => {}
            }
        }
        let mut seen = std::collections::HashSet::new();
        for metric in &self.metrics {
            if !seen.insert(metric.name.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate metric name '{}'",
                    metric.name
                )));
            }
        }
        Ok(())
    }

    /// Looks up a parameter spec by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Interprets the raw values stored on `record` as typed parameter
    /// values, validated against this search space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the record carries a
    /// parameter unknown to this config, or a value outside its domain.
    pub fn trial_parameters(&self, record: &TrialRecord) -> Result<HashMap<String, ParamValue>> {
        let mut out = HashMap::with_capacity(record.parameters.len());
        for (name, value) in &record.parameters {
            let spec = self.parameter(name).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "trial {} has parameter '{name}' not in the study config",
                    record.uid
                ))
            })?;
            if !spec.accepts(value) {
                return Err(Error::InvalidArgument(format!(
                    "trial {}: value {value:?} is outside the domain of parameter '{name}'",
                    record.uid
                )));
            }
            out.insert(name.clone(), value.clone());
        }
        Ok(out)
    }
}
