// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for the hazard calculation core.
//!
//! Every variant here is a hard failure: the cache's correctness
//! guarantees depend on failing loudly the moment an invariant is
//! violated, since silent continuation could contaminate cached values
//! used by all subsequent lookups. Nothing in this crate catches and
//! retries these.

use std::fmt;

/// Errors raised by the cache engine, calculators, and model seams.
#[derive(Debug, Clone)]
pub enum HazardError {
    /// A second model instance under a known logical identity carries a
    /// tracked parameter whose value differs from the reference
    /// parameterization. Mixing incompatibly configured instances over
    /// one cache would silently corrupt cached curves.
    ParameterMismatch {
        /// Display name of the logical model.
        model: String,
        /// Name of the offending parameter.
        param: String,
        /// Value recorded on the reference instance.
        expected: String,
        /// Value found on the new instance.
        found: String,
    },

    /// A new instance of a known logical model is missing a parameter
    /// the reference instance tracks.
    UnknownParameter {
        model: String,
        param: String,
    },

    /// A caller-supplied curve's X sampling differs from the cached
    /// curve for the same (model, IMT, rupture) identity. All curves
    /// sharing an identity must be comparable point-for-point.
    CurveMismatch {
        cached_len: usize,
        given_len: usize,
        cached_min_x: f64,
        given_min_x: f64,
        cached_max_x: f64,
        given_max_x: f64,
    },

    /// A rupture reached a point-source-only path without a point
    /// surface (wraps a description of what was found).
    NotAPointSurface(String),

    /// An event probability implies an effectively infinite Poisson
    /// event count (ln(1-p) below the safety margin). Returning 1.0
    /// here would silently corrupt downstream aggregate hazard curves.
    NearCertainProbability {
        prob: f64,
    },

    /// A fixed-model-set calculator encountered a model instance outside
    /// the originally registered set. Lists every known identity to aid
    /// diagnosing the misconfiguration.
    UnregisteredModel {
        model: String,
        known: Vec<String>,
    },

    /// A weighted list was constructed with invalid weights.
    InvalidWeights(String),

    /// A ground-motion model implementation failed to evaluate.
    ModelFailure(String),
}

impl fmt::Display for HazardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterMismatch {
                model,
                param,
                expected,
                found,
            } => write!(
                f,
                "new instance of {model} differs on parameter '{param}': '{found}' != '{expected}'"
            ),
            Self::UnknownParameter { model, param } => write!(
                f,
                "new instance of {model} has no parameter '{param}'"
            ),
            Self::CurveMismatch {
                cached_len,
                given_len,
                cached_min_x,
                given_min_x,
                cached_max_x,
                given_max_x,
            } => write!(
                f,
                "supplied curve X sampling differs from cached version \
                 (len {given_len} vs {cached_len}, x range [{given_min_x}, {given_max_x}] \
                 vs [{cached_min_x}, {cached_max_x}]); must use consistent x values"
            ),
            Self::NotAPointSurface(found) => {
                write!(f, "rupture surface is not a point surface: {found}")
            }
            Self::NearCertainProbability { prob } => write!(
                f,
                "rupture probability {prob} is too high for a Poisson source \
                 (implies an effectively infinite number of events)"
            ),
            Self::UnregisteredModel { model, known } => write!(
                f,
                "model {model} was not registered with this calculator; known models: [{}]",
                known.join(", ")
            ),
            Self::InvalidWeights(msg) => write!(f, "invalid weighted list: {msg}"),
            Self::ModelFailure(msg) => write!(f, "ground-motion model failure: {msg}"),
        }
    }
}

impl std::error::Error for HazardError {}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HazardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parameter_mismatch_names_both_values() {
        let err = HazardError::ParameterMismatch {
            model: "Synthetic Attenuation".into(),
            param: "Max Distance".into(),
            expected: "200".into(),
            found: "300".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Max Distance"));
        assert!(msg.contains("200"));
        assert!(msg.contains("300"));
    }

    #[test]
    fn display_unregistered_model_lists_known() {
        let err = HazardError::UnregisteredModel {
            model: "rogue".into(),
            known: vec!["a".into(), "b".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("rogue"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn error_trait_object() {
        let err = HazardError::NearCertainProbability { prob: 1.0 };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("Poisson"));
    }

    #[test]
    fn display_curve_mismatch_has_both_shapes() {
        let err = HazardError::CurveMismatch {
            cached_len: 20,
            given_len: 19,
            cached_min_x: 0.001,
            given_min_x: 0.002,
            cached_max_x: 2.0,
            given_max_x: 2.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("19"));
    }
}
