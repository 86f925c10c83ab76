//! Error types for the allocation pipeline.
//!
//! Input defects are accumulated into a single `Validation` error instead of
//! failing at the first problem, so a user can fix a whole batch of mistakes
//! in one round trip. Everything after validation (infeasibility, solver
//! failure, unachievable stability) refers to a structurally valid problem.

use std::fmt;

use thiserror::Error;

use crate::stability::BlockingPair;

/// A single input defect found during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description, naming the offending entity.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A configuration value is out of its permitted range.
    BadConfig,
    /// Two entities share the same id, or an id is empty.
    BadId,
    /// An index refers to an entity that does not exist.
    BadReference,
    /// A capacity or cap is zero or otherwise unusable.
    BadCapacity,
    /// A rank list violates the rank-notation rules.
    BadRank,
    /// A rater ranked a target it is not eligible for.
    IneligibleTarget,
    /// An eligibility cell is missing and the policy forbids that.
    MissingEligibility,
    /// A student has no project left to be assigned to.
    NoEligibleProject,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        ValidationError {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top-level error type of the allocation pipeline.
#[derive(Debug, Error)]
pub enum AllocError {
    /// The input data is malformed. Carries every defect found, not just the
    /// first one.
    #[error("validation failed with {} error(s):\n{}", .0.len(), format_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The hard constraints admit no assignment at all.
    #[error("no feasible assignment exists: {0}")]
    Infeasible(String),

    /// The external solver failed, or stopped without a proven optimum.
    /// Carries the solver's raw status text.
    #[error("solver failure: {0}")]
    Solver(String),

    /// The configured policy requires a stable assignment and none exists.
    /// Carries the blocking pairs found in the final attempt.
    #[error(
        "no fully stable assignment exists; the final attempt left {} blocking pair(s)",
        .0.len()
    )]
    StabilityUnachievable(Vec<BlockingPair>),
}

impl From<crate::solver::SolverFailure> for AllocError {
    fn from(failure: crate::solver::SolverFailure) -> Self {
        AllocError::Solver(failure.0)
    }
}
