//! Run configuration.
//!
//! All knobs of a run live in one plain struct, so the input collaborator can
//! deserialize it and the CLI can override single fields. Validation is part
//! of the accumulated validation pass of problem construction.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationErrorKind};
use crate::preferences::RankNotation;
use crate::SCORE_EPS;

/// Fixed default seed. Runs are reproducible without any configuration; a
/// different seed is a deliberate choice, not an accident of process state.
pub const DEFAULT_SEED: u64 = 1234;

/// What the engine does about stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityPolicy {
    /// Minimize weighted dissatisfaction; accept instability.
    MinimizeOnly,
    /// Produce a fully stable assignment or fail.
    RequireStable,
    /// Try for a stable assignment, fall back to plain minimization.
    PreferStableFallback,
}

/// How to treat a (student, project) pair without an eligibility entry when
/// an eligibility section is present. With no eligibility section at all,
/// everyone is eligible for everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEligibility {
    Eligible,
    Ineligible,
    /// A missing entry is an input error. The safe default: the operator must
    /// say what blank means rather than the program guessing.
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weight of student dissatisfaction in the objective.
    pub student_weight: f64,
    /// Weight of supervisor dissatisfaction; must sum to 1 with the above.
    pub supervisor_weight: f64,
    /// Exponent applied to each side's score before weighting (>= 1). Values
    /// above 1 penalize single large dissatisfactions more than the same
    /// total spread over several moderate ones.
    pub dissatisfaction_exponent: f64,
    /// Rank notation assumed for raters that do not declare their own.
    pub rank_notation: RankNotation,
    pub missing_eligibility: MissingEligibility,
    pub stability_policy: StabilityPolicy,
    /// Restrict assignments to projects the student explicitly ranked.
    pub explicit_rank_only: bool,
    /// Seed of the deterministic shuffle.
    pub seed: u64,
    /// Solver time limit in seconds, if any.
    pub solver_time_limit: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            student_weight: 0.7,
            supervisor_weight: 0.3,
            dissatisfaction_exponent: 1.0,
            rank_notation: RankNotation::Fractional,
            missing_eligibility: MissingEligibility::Invalid,
            stability_policy: StabilityPolicy::PreferStableFallback,
            explicit_rank_only: false,
            seed: DEFAULT_SEED,
            solver_time_limit: None,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self, errors: &mut Vec<ValidationError>) {
        if !(0.0..=1.0).contains(&self.student_weight)
            || !(0.0..=1.0).contains(&self.supervisor_weight)
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadConfig,
                format!(
                    "weights must lie in [0, 1]; got student_weight={}, supervisor_weight={}",
                    self.student_weight, self.supervisor_weight
                ),
            ));
        } else if (self.student_weight + self.supervisor_weight - 1.0).abs() > SCORE_EPS {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadConfig,
                format!(
                    "student_weight + supervisor_weight must equal 1; got {} + {} = {}",
                    self.student_weight,
                    self.supervisor_weight,
                    self.student_weight + self.supervisor_weight
                ),
            ));
        }
        if !(self.dissatisfaction_exponent >= 1.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadConfig,
                format!(
                    "dissatisfaction_exponent must be >= 1; got {}",
                    self.dissatisfaction_exponent
                ),
            ));
        }
        if let Some(limit) = self.solver_time_limit {
            if !(limit > 0.0) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadConfig,
                    format!("solver_time_limit must be positive; got {}", limit),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let mut errors = Vec::new();
        Config::default().validate(&mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let config = Config {
            student_weight: 0.7,
            supervisor_weight: 0.2,
            ..Config::default()
        };
        let mut errors = Vec::new();
        config.validate(&mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::BadConfig);
    }

    #[test]
    fn exponent_below_one_is_rejected() {
        let config = Config {
            dissatisfaction_exponent: 0.5,
            ..Config::default()
        };
        let mut errors = Vec::new();
        config.validate(&mut errors);
        assert_eq!(errors.len(), 1);
    }
}
