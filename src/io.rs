//! Formatting and exchange of problems and solutions.
//!
//! The crate core is format-agnostic; this module holds the simple JSON
//! exchange format (`simple`) and a human-readable rendering of a solution.

pub mod simple;

use std::fmt::Write;

use crate::problem::Problem;
use crate::solution::Solution;
use crate::stability::BlockingTrigger;

/// Format a solution into a human-readable String (e.g. to print it to
/// stdout).
///
/// The output format will look like
///
/// ```text
/// ===== Some project title =====
/// Anna Anderson (student rank 1, supervisor rank 2)
///
/// ===== Another project title =====
/// …
/// ```
///
/// followed by the unassigned students, the per-project usage table, summary
/// statistics and the stability report.
pub fn format_solution(problem: &Problem, solution: &Solution) -> String {
    let mut result = String::new();
    let assignment = solution.assignment();

    for (p, project) in problem.projects.iter().enumerate() {
        write!(result, "\n===== {} =====\n", project.title).unwrap();
        for (s, assigned) in assignment.iter().enumerate() {
            if *assigned == Some(p) {
                write!(
                    result,
                    "{} (student rank {}, supervisor rank {})\n",
                    problem.students[s].name,
                    problem.scores.student[[s, p]],
                    problem.scores.supervisor[[s, p]],
                )
                .unwrap();
            }
        }
    }

    let unassigned = solution.unassigned();
    if !unassigned.is_empty() {
        write!(result, "\n===== Unassigned students =====\n").unwrap();
        for s in unassigned {
            write!(result, "{}\n", problem.students[s].name).unwrap();
        }
    }

    write!(result, "\n===== Project usage =====\n").unwrap();
    for usage in solution.project_usage(problem) {
        write!(
            result,
            "{}: {}/{} assigned, ranked by {} student(s), popularity rank {}\n",
            problem.projects[usage.project].title,
            usage.assigned,
            usage.capacity,
            usage.ranked_by,
            usage.popularity_rank,
        )
        .unwrap();
    }

    if let Some(summary) = solution.summary(problem) {
        write!(result, "\n===== Summary =====\n").unwrap();
        write!(
            result,
            "student dissatisfaction: mean {:.3}, median {:.3}, min {}, max {}\n",
            summary.student.mean, summary.student.median, summary.student.min, summary.student.max,
        )
        .unwrap();
        write!(
            result,
            "supervisor dissatisfaction: mean {:.3}, median {:.3}, min {}, max {}\n",
            summary.supervisor.mean,
            summary.supervisor.median,
            summary.supervisor.min,
            summary.supervisor.max,
        )
        .unwrap();
        write!(
            result,
            "students on a project they did not rank: {}\n",
            summary.unranked_assignments
        )
        .unwrap();
        write!(result, "objective value: {}\n", solution.objective()).unwrap();
    }

    write!(result, "\n===== Stability =====\n").unwrap();
    let report = solution.stability();
    if report.is_stable() {
        write!(result, "stable (no blocking pairs)\n").unwrap();
    } else {
        for pair in &report.blocking {
            let current = match pair.current {
                Some(p) => problem.projects[p].title.as_str(),
                None => "(nothing)",
            };
            let reason = match pair.trigger {
                BlockingTrigger::OpenCapacity => "the project has a free slot".to_string(),
                BlockingTrigger::SupervisorPrefers { held } => format!(
                    "its supervisors strictly prefer them over {}",
                    problem.students[held].name
                ),
            };
            write!(
                result,
                "{} would rather have {} than {}, and {}\n",
                problem.students[pair.student].name,
                problem.projects[pair.alternative].title,
                current,
                reason,
            )
            .unwrap();
        }
    }
    write!(result, "outcome: {}\n", solution.outcome()).unwrap();

    result
}
