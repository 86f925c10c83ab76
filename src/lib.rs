//! Allocation of students to capacity-limited projects.
//!
//! Students rank projects and supervisors rank students (per project each
//! supervisor runs); both sides may express ties, and hard eligibility rules
//! override any preference. The engine minimizes combined weighted
//! dissatisfaction via an external MILP solver and can additionally enforce
//! or prefer stability (no blocking pairs) under tied preferences.
//!
//! The crate core works on in-memory entities only; reading and writing the
//! simple JSON exchange format lives in [`io`], and everything else is
//! format-agnostic.

pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;
pub mod preferences;
pub mod problem;
pub mod scoring;
pub mod shuffle;
pub mod solution;
pub mod solver;
pub mod stability;

use serde::{Deserialize, Serialize};

use crate::preferences::RankNotation;

/// Tolerance below which two dissatisfaction scores count as equal. Canonical
/// scores are halves, but means over several supervisors can produce values
/// that only agree up to rounding.
pub(crate) const SCORE_EPS: f64 = 1e-9;

/// One raw rank a rater assigned to a target, exactly as read from the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Index of the ranked target in its entity list.
    pub target: usize,
    /// Raw rank in the rater's declared notation (1 is most preferred).
    pub rank: f64,
}

/// A student with their raw project preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Index of the student in the problem's student list.
    #[serde(default)]
    pub index: usize,
    /// Unique identifier; the canonical sort key of the deterministic order.
    pub id: String,
    /// Display name for reports.
    pub name: String,
    /// Raw rank entries over projects. Projects not listed here are taken as
    /// unranked and share the remaining dissatisfaction budget.
    #[serde(default)]
    pub ranks: Vec<RankEntry>,
    /// Rank notation of this student's entries; falls back to the configured
    /// default when absent.
    #[serde(default)]
    pub notation: Option<RankNotation>,
}

/// One supervisor's raw ranking of students for a single project they run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRanking {
    /// Index of the project the ranking refers to.
    pub project: usize,
    /// Raw rank entries over students.
    #[serde(default)]
    pub ranks: Vec<RankEntry>,
    #[serde(default)]
    pub notation: Option<RankNotation>,
}

/// A supervisor with optional capacity caps and per-project rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supervisor {
    /// Index of the supervisor in the problem's supervisor list.
    #[serde(default)]
    pub index: usize,
    /// Unique identifier.
    pub id: String,
    /// Display name for reports.
    pub name: String,
    /// Maximum number of students across all this supervisor's projects.
    #[serde(default)]
    pub max_students: Option<u32>,
    /// Maximum number of this supervisor's projects that may receive any
    /// student at all.
    #[serde(default)]
    pub max_projects: Option<u32>,
    /// Rankings of students, one per project this supervisor runs. Projects
    /// without a ranking treat all eligible students as tied.
    #[serde(default)]
    pub rankings: Vec<ProjectRanking>,
}

/// A project with its student capacity and supervisors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Index of the project in the problem's project list.
    #[serde(default)]
    pub index: usize,
    /// Unique identifier.
    pub id: String,
    /// Display title for reports.
    pub title: String,
    /// Maximum number of students this project takes.
    pub capacity: u32,
    /// Indexes of the supervisors running this project; at least one.
    pub supervisors: Vec<usize>,
}

/// An explicit eligibility statement for one (student, project) pair. Pairs
/// without an entry are resolved by the configured missing-eligibility
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityEntry {
    pub student: usize,
    pub project: usize,
    pub eligible: bool,
}

/// An assignment of students to projects: one entry per student, `None`
/// while (or if) the student is unassigned. Owned exclusively by the
/// algorithm building it until frozen into a [`solution::Solution`].
pub type Assignment = Vec<Option<usize>>;
