//! Blocking-pair analysis of a candidate assignment.
//!
//! An assignment is unstable if some student and some alternative project
//! would rather pair up with each other than stay with their current match.
//! Preferences here may be tied, so "rather" is a three-valued comparison
//! over canonical scores: equal scores mean indifference, and indifference
//! never blocks. The analyzer is read-only and also handles partial
//! assignments: an unassigned student strictly prefers every project in its
//! domain over having nothing.

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::problem::Problem;
use crate::{Assignment, SCORE_EPS};

/// Outcome of comparing two dissatisfaction scores from one rater's point of
/// view: does the rater prefer the target scored `a` over the one scored `b`?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaning {
    StrictlyPrefers,
    Indifferent,
    StrictlyDisprefers,
}

/// Tie-aware comparison of two dissatisfaction scores (lower is better).
pub fn compare(a: f64, b: f64) -> Leaning {
    if a < b - SCORE_EPS {
        Leaning::StrictlyPrefers
    } else if a > b + SCORE_EPS {
        Leaning::StrictlyDisprefers
    } else {
        Leaning::Indifferent
    }
}

/// What makes the alternative project able to accept the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingTrigger {
    /// The alternative project has a free slot (and its supervisors have
    /// headroom), so the student's strict preference alone blocks.
    OpenCapacity,
    /// The alternative project strictly prefers the student over one it
    /// currently holds.
    SupervisorPrefers {
        /// The held student that would be displaced.
        held: usize,
    },
}

/// One witness of instability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockingPair {
    pub student: usize,
    /// The student's current project, if any.
    pub current: Option<usize>,
    /// The project both sides would rather combine on.
    pub alternative: usize,
    pub trigger: BlockingTrigger,
}

/// Result of analyzing one assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StabilityReport {
    /// All blocking pairs found; empty means stable.
    pub blocking: Vec<BlockingPair>,
}

impl StabilityReport {
    pub fn is_stable(&self) -> bool {
        self.blocking.is_empty()
    }
}

/// Find every blocking pair of the given assignment.
pub fn analyze(problem: &Problem, assignment: &Assignment) -> StabilityReport {
    let n_students = problem.n_students();
    let n_projects = problem.n_projects();
    let student_scores = &problem.scores.student;
    let supervisor_scores = &problem.scores.supervisor;

    let mut held: Vec<Vec<usize>> = vec![Vec::new(); n_projects];
    let mut supervisor_load = vec![0u32; problem.supervisors.len()];
    for (s, &assigned) in assignment.iter().enumerate() {
        if let Some(p) = assigned {
            held[p].push(s);
            for &sv in &problem.projects[p].supervisors {
                supervisor_load[sv] += 1;
            }
        }
    }
    let mut active_projects = vec![0u32; problem.supervisors.len()];
    for (p, students) in held.iter().enumerate() {
        if !students.is_empty() {
            for &sv in &problem.projects[p].supervisors {
                active_projects[sv] += 1;
            }
        }
    }

    let mut blocking = Vec::new();
    for s in 0..n_students {
        let current = assignment[s];
        let current_score = match current {
            Some(p) => student_scores[[s, p]],
            // Nothing at all is worse than any project in the domain.
            None => f64::INFINITY,
        };
        for alt in 0..n_projects {
            if !problem.domain[[s, alt]] || current == Some(alt) {
                continue;
            }
            if compare(student_scores[[s, alt]], current_score) != Leaning::StrictlyPrefers {
                continue;
            }
            let project = &problem.projects[alt];
            let has_free_slot = (held[alt].len() as u32) < project.capacity;
            let supervisors_have_room = project.supervisors.iter().all(|&sv| {
                match problem.supervisors[sv].max_students {
                    Some(cap) => supervisor_load[sv] < cap,
                    None => true,
                }
            });
            // An empty project only offers its free slots if filling it would
            // not push a supervisor past their project cap.
            let activation_ok = !held[alt].is_empty()
                || project.supervisors.iter().all(|&sv| {
                    match problem.supervisors[sv].max_projects {
                        Some(cap) => active_projects[sv] < cap,
                        None => true,
                    }
                });
            if has_free_slot && supervisors_have_room && activation_ok {
                blocking.push(BlockingPair {
                    student: s,
                    current,
                    alternative: alt,
                    trigger: BlockingTrigger::OpenCapacity,
                });
                continue;
            }
            // No open slot: the project would have to drop someone it likes
            // less. Check against its least preferred held student.
            let weakest = held[alt]
                .iter()
                .copied()
                .max_by_key(|&w| OrderedFloat(supervisor_scores[[w, alt]]));
            if let Some(w) = weakest {
                if compare(supervisor_scores[[s, alt]], supervisor_scores[[w, alt]])
                    == Leaning::StrictlyPrefers
                {
                    blocking.push(BlockingPair {
                        student: s,
                        current,
                        alternative: alt,
                        trigger: BlockingTrigger::SupervisorPrefers { held: w },
                    });
                }
            }
        }
    }
    StabilityReport { blocking }
}
