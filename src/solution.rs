//! The finalized result of a run.
//!
//! A `Solution` freezes the assignment together with its objective value,
//! the stability report and the mode-outcome tag. Everything else (rows,
//! occupancy, statistics) is derived read-only against the problem.

use serde::Serialize;

use crate::problem::Problem;
use crate::stability::StabilityReport;
use crate::Assignment;

/// How the mode controller arrived at the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOutcome {
    /// The final assignment is verified stable (whether stability was
    /// enforced or happened on its own).
    StableAchieved,
    /// The final assignment contains blocking pairs; either stability was
    /// not requested or it was not achievable and the policy fell back.
    UnstableFallback,
    /// No assignment satisfies the hard constraints. Never attached to a
    /// `Solution`; reported through the error path.
    Infeasible,
}

impl std::fmt::Display for ModeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ModeOutcome::StableAchieved => "stable-achieved",
            ModeOutcome::UnstableFallback => "unstable-fallback",
            ModeOutcome::Infeasible => "infeasible",
        };
        write!(f, "{}", text)
    }
}

/// One line of the per-student result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AllocationRow {
    pub student: usize,
    pub project: usize,
    pub student_score: f64,
    pub supervisor_score: f64,
    pub combined_score: f64,
}

/// Mean, median, min and max of one side's dissatisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub student: SideStats,
    pub supervisor: SideStats,
    /// Students assigned a project they did not explicitly rank.
    pub unranked_assignments: usize,
}

/// Occupancy and popularity of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectUsage {
    pub project: usize,
    pub assigned: usize,
    pub capacity: u32,
    /// Number of students that actively ranked the project.
    pub ranked_by: usize,
    /// Sum of all students' dissatisfaction with the project; low means
    /// popular.
    pub total_dissatisfaction: f64,
    /// Fractional rank of the project by popularity (1 = most popular; tied
    /// projects share the mean of the ranks they occupy).
    pub popularity_rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    assignment: Assignment,
    objective: f64,
    outcome: ModeOutcome,
    stability: StabilityReport,
}

impl Solution {
    /// Freeze an assignment into a solution, computing the objective value.
    pub(crate) fn assemble(
        problem: &Problem,
        assignment: Assignment,
        stability: StabilityReport,
        outcome: ModeOutcome,
    ) -> Solution {
        let objective = assignment
            .iter()
            .enumerate()
            .filter_map(|(s, assigned)| assigned.map(|p| problem.scores.combined[[s, p]]))
            .sum();
        Solution {
            assignment,
            objective,
            outcome,
            stability,
        }
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn outcome(&self) -> ModeOutcome {
        self.outcome
    }

    pub fn stability(&self) -> &StabilityReport {
        &self.stability
    }

    /// Per-student result rows, in canonical student order.
    pub fn rows(&self, problem: &Problem) -> Vec<AllocationRow> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(s, assigned)| {
                assigned.map(|p| AllocationRow {
                    student: s,
                    project: p,
                    student_score: problem.scores.student[[s, p]],
                    supervisor_score: problem.scores.supervisor[[s, p]],
                    combined_score: problem.scores.combined[[s, p]],
                })
            })
            .collect()
    }

    /// Students without a project; empty on full success.
    pub fn unassigned(&self) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, assigned)| assigned.is_none())
            .map(|(s, _)| s)
            .collect()
    }

    /// Occupancy and popularity per project, in canonical project order.
    pub fn project_usage(&self, problem: &Problem) -> Vec<ProjectUsage> {
        let n_projects = problem.n_projects();
        let mut assigned = vec![0usize; n_projects];
        for a in self.assignment.iter().flatten() {
            assigned[*a] += 1;
        }
        let totals: Vec<f64> = (0..n_projects)
            .map(|p| {
                (0..problem.n_students())
                    .filter(|&s| problem.eligible[[s, p]])
                    .map(|s| problem.scores.student[[s, p]])
                    .sum()
            })
            .collect();
        let ranks = fractional_ranks(&totals);
        (0..n_projects)
            .map(|p| ProjectUsage {
                project: p,
                assigned: assigned[p],
                capacity: problem.projects[p].capacity,
                ranked_by: problem.popularity(p),
                total_dissatisfaction: totals[p],
                popularity_rank: ranks[p],
            })
            .collect()
    }

    /// Summary statistics over the assigned rows, or `None` if nothing was
    /// assigned at all.
    pub fn summary(&self, problem: &Problem) -> Option<Summary> {
        let rows = self.rows(problem);
        if rows.is_empty() {
            return None;
        }
        let student_scores: Vec<f64> = rows.iter().map(|r| r.student_score).collect();
        let supervisor_scores: Vec<f64> = rows.iter().map(|r| r.supervisor_score).collect();
        let unranked_assignments = rows
            .iter()
            .filter(|r| !problem.explicit[[r.student, r.project]])
            .count();
        Some(Summary {
            student: side_stats(&student_scores),
            supervisor: side_stats(&supervisor_scores),
            unranked_assignments,
        })
    }
}

fn side_stats(scores: &[f64]) -> SideStats {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    SideStats {
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
        min: sorted[0],
        max: sorted[n - 1],
    }
}

/// Fractional ranks of arbitrary values, ascending: ties share the mean of
/// the ranks they jointly occupy.
fn fractional_ranks(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let below = values.iter().filter(|&&x| x < v).count() as f64;
            let equal = values.iter().filter(|&&x| x == v).count() as f64;
            below + (equal + 1.0) / 2.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    #[test]
    fn fractional_ranks_share_tied_positions() {
        let ranks = fractional_ranks(&[10.0, 5.0, 5.0, 20.0]);
        assert_eq!(ranks, vec![3.0, 1.5, 1.5, 4.0]);
    }

    #[test]
    fn side_stats_handle_even_and_odd_counts() {
        let odd = side_stats(&[3.0, 1.0, 2.0]);
        assert_float_absolute_eq!(odd.median, 2.0);
        assert_float_absolute_eq!(odd.mean, 2.0);
        assert_float_absolute_eq!(odd.min, 1.0);
        assert_float_absolute_eq!(odd.max, 3.0);

        let even = side_stats(&[4.0, 1.0, 2.0, 3.0]);
        assert_float_absolute_eq!(even.median, 2.5);
    }
}
