//! The simple JSON exchange format: canonical serde representation of the
//! entity structs on the way in, a tagged envelope with the solution on the
//! way out.

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::problem::Problem;
use crate::solution::Solution;
use crate::{EligibilityEntry, Project, Student, Supervisor};

/// The raw content of an input document, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInput {
    #[serde(default)]
    pub config: Option<Config>,
    pub supervisors: Vec<Supervisor>,
    pub projects: Vec<Project>,
    pub students: Vec<Student>,
    #[serde(default)]
    pub eligibility: Option<Vec<EligibilityEntry>>,
}

/// Read an input document from the simple JSON representation.
///
/// Index fields of the entities are set from their list positions; all other
/// validation is left to problem construction.
pub fn read<R: std::io::Read>(reader: R) -> Result<RawInput, String> {
    let mut input: RawInput = serde_json::from_reader(reader).map_err(|e| e.to_string())?;
    for (i, supervisor) in input.supervisors.iter_mut().enumerate() {
        supervisor.index = i;
    }
    for (i, project) in input.projects.iter_mut().enumerate() {
        project.index = i;
    }
    for (i, student) in input.students.iter_mut().enumerate() {
        student.index = i;
    }
    Ok(input)
}

/// Write the solved assignment as simple JSON representation to a Writer
/// (e.g. an output file).
///
/// Entities are referenced by id, so the document stands on its own. The
/// timestamp lives only in this envelope; the solution itself carries none
/// and stays reproducible.
pub fn write<W: std::io::Write>(
    writer: W,
    problem: &Problem,
    solution: &Solution,
) -> Result<(), String> {
    let assignments: Vec<serde_json::Value> = solution
        .rows(problem)
        .iter()
        .map(|row| {
            json!({
                "student": problem.students[row.student].id,
                "project": problem.projects[row.project].id,
                "student_score": row.student_score,
                "supervisor_score": row.supervisor_score,
                "combined_score": row.combined_score,
            })
        })
        .collect();
    let unassigned: Vec<&str> = solution
        .unassigned()
        .into_iter()
        .map(|s| problem.students[s].id.as_str())
        .collect();
    let projects: Vec<serde_json::Value> = solution
        .project_usage(problem)
        .iter()
        .map(|usage| {
            json!({
                "project": problem.projects[usage.project].id,
                "assigned": usage.assigned,
                "capacity": usage.capacity,
                "ranked_by": usage.ranked_by,
                "total_dissatisfaction": usage.total_dissatisfaction,
                "popularity_rank": usage.popularity_rank,
            })
        })
        .collect();
    let blocking: Vec<serde_json::Value> = solution
        .stability()
        .blocking
        .iter()
        .map(|pair| {
            json!({
                "student": problem.students[pair.student].id,
                "current": pair.current.map(|p| problem.projects[p].id.clone()),
                "alternative": problem.projects[pair.alternative].id,
            })
        })
        .collect();

    let data = json!({
        "format": "X-projectassignment-simple",
        "version": "1.0",
        "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "outcome": solution.outcome(),
        "objective": solution.objective(),
        "assignments": assignments,
        "unassigned": unassigned,
        "projects": projects,
        "stable": solution.stability().is_stable(),
        "blocking_pairs": blocking,
        "summary": solution.summary(problem),
    });
    serde_json::to_writer(writer, &data).map_err(|e| e.to_string())?;

    Ok(())
}
