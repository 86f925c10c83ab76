//! Problem construction: accumulating validation, canonical entity order and
//! derived score matrices.
//!
//! Entities arrive in whatever order the input collaborator produced them.
//! Construction validates everything it can (collecting all defects rather
//! than stopping at the first), then brings the entity lists into canonical
//! order: supervisors and projects sorted by id, students sorted by id and
//! then shuffled with the seeded generator (see [`crate::shuffle`]). All
//! index references are rewritten accordingly, so the rest of the pipeline
//! never sees the input order. After construction nothing here is mutated.

use log::warn;
use ndarray::Array2;

use crate::config::{Config, MissingEligibility};
use crate::error::{AllocError, ValidationError, ValidationErrorKind};
use crate::scoring::Scores;
use crate::shuffle;
use crate::{EligibilityEntry, Project, Student, Supervisor};

pub struct Problem {
    pub config: Config,
    pub supervisors: Vec<Supervisor>,
    pub projects: Vec<Project>,
    pub students: Vec<Student>,
    /// `eligible[[s, p]]`: may student s be assigned to project p at all?
    pub eligible: Array2<bool>,
    /// `explicit[[s, p]]`: did student s actively rank project p?
    pub explicit: Array2<bool>,
    /// `domain[[s, p]]`: pairs admitted to assignment. Equals `eligible`
    /// unless `explicit_rank_only` restricts it further.
    pub domain: Array2<bool>,
    /// Canonical dissatisfaction scores derived once from the raw ranks.
    pub scores: Scores,
}

impl Problem {
    /// Validate, canonicalize and derive. Returns every defect found, not
    /// just the first one.
    pub fn new(
        supervisors: Vec<Supervisor>,
        projects: Vec<Project>,
        students: Vec<Student>,
        eligibility: Option<Vec<EligibilityEntry>>,
        config: Config,
    ) -> Result<Problem, AllocError> {
        let mut errors = Vec::new();
        config.validate(&mut errors);
        check_structure(&supervisors, &projects, &students, &eligibility, &mut errors);
        if !errors.is_empty() {
            // Index references may be unusable; canonicalization would panic.
            return Err(AllocError::Validation(errors));
        }

        let (supervisors, projects, students, eligibility) =
            canonicalize(supervisors, projects, students, eligibility, config.seed);

        let n_students = students.len();
        let n_projects = projects.len();

        let eligible = build_eligibility(
            &students,
            &projects,
            eligibility,
            config.missing_eligibility,
            &mut errors,
        );

        for (s, student) in students.iter().enumerate() {
            if !(0..n_projects).any(|p| eligible[[s, p]]) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NoEligibleProject,
                    format!("student {:?} is not eligible for any project", student.id),
                ));
            }
            for entry in &student.ranks {
                if !eligible[[s, entry.target]] {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::IneligibleTarget,
                        format!(
                            "student {:?} ranked project {:?} but is not eligible for it",
                            student.id, projects[entry.target].id
                        ),
                    ));
                }
            }
        }
        for (p, project) in projects.iter().enumerate() {
            if !(0..n_students).any(|s| eligible[[s, p]]) {
                warn!(
                    "project {:?} has no eligible students and will stay empty",
                    project.id
                );
            }
        }
        for supervisor in &supervisors {
            for ranking in &supervisor.rankings {
                for entry in &ranking.ranks {
                    if !eligible[[entry.target, ranking.project]] {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::IneligibleTarget,
                            format!(
                                "supervisor {:?} ranked student {:?} for project {:?}, \
                                 but the student is not eligible for it",
                                supervisor.id,
                                students[entry.target].id,
                                projects[ranking.project].id
                            ),
                        ));
                    }
                }
            }
        }
        if !errors.is_empty() {
            return Err(AllocError::Validation(errors));
        }

        let scores = Scores::compute(&config, &supervisors, &projects, &students, &eligible)
            .map_err(AllocError::Validation)?;

        let mut explicit = Array2::from_elem((n_students, n_projects), false);
        for (s, student) in students.iter().enumerate() {
            for entry in &student.ranks {
                explicit[[s, entry.target]] = true;
            }
        }
        let mut domain = eligible.clone();
        if config.explicit_rank_only {
            for s in 0..n_students {
                for p in 0..n_projects {
                    domain[[s, p]] &= explicit[[s, p]];
                }
            }
        }

        Ok(Problem {
            config,
            supervisors,
            projects,
            students,
            eligible,
            explicit,
            domain,
            scores,
        })
    }

    pub fn n_students(&self) -> usize {
        self.students.len()
    }

    pub fn n_projects(&self) -> usize {
        self.projects.len()
    }

    /// Number of students that actively ranked this project.
    pub fn popularity(&self, project: usize) -> usize {
        (0..self.n_students())
            .filter(|&s| self.explicit[[s, project]])
            .count()
    }

    pub fn student_index(&self, id: &str) -> Option<usize> {
        self.students.iter().position(|s| s.id == id)
    }

    pub fn project_index(&self, id: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.id == id)
    }
}

fn check_unique_ids<'a, I>(kind: &str, ids: I, errors: &mut Vec<ValidationError>)
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadId,
                format!("empty {} id", kind),
            ));
        } else if !seen.insert(id.to_owned()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadId,
                format!("duplicate {} id {:?}", kind, id),
            ));
        }
    }
}

/// Structural checks that must hold before any index is dereferenced.
fn check_structure(
    supervisors: &[Supervisor],
    projects: &[Project],
    students: &[Student],
    eligibility: &Option<Vec<EligibilityEntry>>,
    errors: &mut Vec<ValidationError>,
) {
    if supervisors.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::BadReference,
            "no supervisors defined",
        ));
    }
    if projects.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::BadReference,
            "no projects defined",
        ));
    }
    if students.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::BadReference,
            "no students defined",
        ));
    }
    check_unique_ids("supervisor", supervisors.iter().map(|v| v.id.as_str()), errors);
    check_unique_ids("project", projects.iter().map(|p| p.id.as_str()), errors);
    check_unique_ids("student", students.iter().map(|s| s.id.as_str()), errors);

    for supervisor in supervisors {
        if supervisor.max_students == Some(0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadCapacity,
                format!("supervisor {:?} has max_students 0", supervisor.id),
            ));
        }
        if supervisor.max_projects == Some(0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadCapacity,
                format!("supervisor {:?} has max_projects 0", supervisor.id),
            ));
        }
        for ranking in &supervisor.rankings {
            if ranking.project >= projects.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "supervisor {:?} ranks students for unknown project index {}",
                        supervisor.id, ranking.project
                    ),
                ));
                continue;
            }
            for entry in &ranking.ranks {
                if entry.target >= students.len() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::BadReference,
                        format!(
                            "supervisor {:?} ranks unknown student index {}",
                            supervisor.id, entry.target
                        ),
                    ));
                }
            }
        }
    }

    for project in projects {
        if project.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadCapacity,
                format!("project {:?} has capacity 0", project.id),
            ));
        }
        if project.supervisors.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BadReference,
                format!("project {:?} has no supervisor", project.id),
            ));
        }
        for &sv in &project.supervisors {
            if sv >= supervisors.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "project {:?} references unknown supervisor index {}",
                        project.id, sv
                    ),
                ));
            }
        }
    }

    // A supervisor may only rank students for projects they actually run.
    for (sv, supervisor) in supervisors.iter().enumerate() {
        let mut ranked = std::collections::HashSet::new();
        for ranking in &supervisor.rankings {
            if ranking.project >= projects.len() {
                continue; // reported above
            }
            if !projects[ranking.project].supervisors.contains(&sv) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "supervisor {:?} ranks students for project {:?}, \
                         which they do not supervise",
                        supervisor.id, projects[ranking.project].id
                    ),
                ));
            }
            if !ranked.insert(ranking.project) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "supervisor {:?} has two rankings for project {:?}",
                        supervisor.id, projects[ranking.project].id
                    ),
                ));
            }
        }
    }

    for student in students {
        for entry in &student.ranks {
            if entry.target >= projects.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "student {:?} ranks unknown project index {}",
                        student.id, entry.target
                    ),
                ));
            }
        }
    }

    if let Some(entries) = eligibility {
        for entry in entries {
            if entry.student >= students.len() || entry.project >= projects.len() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::BadReference,
                    format!(
                        "eligibility entry references unknown student index {} \
                         or project index {}",
                        entry.student, entry.project
                    ),
                ));
            }
        }
    }
}

/// Bring entities into canonical order and rewrite every index reference.
///
/// Students get the seeded sort-and-shuffle order; projects and supervisors
/// are sorted by id only.
fn canonicalize(
    supervisors: Vec<Supervisor>,
    projects: Vec<Project>,
    students: Vec<Student>,
    eligibility: Option<Vec<EligibilityEntry>>,
    seed: u64,
) -> (
    Vec<Supervisor>,
    Vec<Project>,
    Vec<Student>,
    Option<Vec<EligibilityEntry>>,
) {
    let mut sup_order: Vec<usize> = (0..supervisors.len()).collect();
    sup_order.sort_by(|&a, &b| supervisors[a].id.cmp(&supervisors[b].id));
    let mut proj_order: Vec<usize> = (0..projects.len()).collect();
    proj_order.sort_by(|&a, &b| projects[a].id.cmp(&projects[b].id));
    let stu_ids: Vec<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let stu_order = shuffle::deterministic_order(&stu_ids, seed);

    let mut new_of_sup = vec![0usize; supervisors.len()];
    for (new, &old) in sup_order.iter().enumerate() {
        new_of_sup[old] = new;
    }
    let mut new_of_proj = vec![0usize; projects.len()];
    for (new, &old) in proj_order.iter().enumerate() {
        new_of_proj[old] = new;
    }
    let mut new_of_stu = vec![0usize; students.len()];
    for (new, &old) in stu_order.iter().enumerate() {
        new_of_stu[old] = new;
    }

    let mut supervisors: Vec<Supervisor> = sup_order
        .iter()
        .map(|&old| supervisors[old].clone())
        .collect();
    for (index, supervisor) in supervisors.iter_mut().enumerate() {
        supervisor.index = index;
        for ranking in supervisor.rankings.iter_mut() {
            ranking.project = new_of_proj[ranking.project];
            for entry in ranking.ranks.iter_mut() {
                entry.target = new_of_stu[entry.target];
            }
        }
        supervisor.rankings.sort_by_key(|r| r.project);
    }

    let mut projects: Vec<Project> = proj_order
        .iter()
        .map(|&old| projects[old].clone())
        .collect();
    for (index, project) in projects.iter_mut().enumerate() {
        project.index = index;
        for sv in project.supervisors.iter_mut() {
            *sv = new_of_sup[*sv];
        }
        project.supervisors.sort_unstable();
        project.supervisors.dedup();
    }

    let mut students: Vec<Student> = stu_order
        .iter()
        .map(|&old| students[old].clone())
        .collect();
    for (index, student) in students.iter_mut().enumerate() {
        student.index = index;
        for entry in student.ranks.iter_mut() {
            entry.target = new_of_proj[entry.target];
        }
    }

    let eligibility = eligibility.map(|entries| {
        entries
            .into_iter()
            .map(|e| EligibilityEntry {
                student: new_of_stu[e.student],
                project: new_of_proj[e.project],
                eligible: e.eligible,
            })
            .collect()
    });

    (supervisors, projects, students, eligibility)
}

fn build_eligibility(
    students: &[Student],
    projects: &[Project],
    eligibility: Option<Vec<EligibilityEntry>>,
    missing: MissingEligibility,
    errors: &mut Vec<ValidationError>,
) -> Array2<bool> {
    let shape = (students.len(), projects.len());
    let mut eligible = Array2::from_elem(shape, true);
    let entries = match eligibility {
        // No eligibility section at all: everyone is eligible.
        None => return eligible,
        Some(entries) => entries,
    };

    let mut provided = Array2::from_elem(shape, false);
    for entry in &entries {
        eligible[[entry.student, entry.project]] = entry.eligible;
        provided[[entry.student, entry.project]] = true;
    }
    for s in 0..students.len() {
        for p in 0..projects.len() {
            if provided[[s, p]] {
                continue;
            }
            match missing {
                MissingEligibility::Eligible => {}
                MissingEligibility::Ineligible => eligible[[s, p]] = false,
                MissingEligibility::Invalid => {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::MissingEligibility,
                        format!(
                            "no eligibility entry for student {:?} and project {:?}; \
                             configure missing_eligibility to resolve blanks",
                            students[s].id, projects[p].id
                        ),
                    ));
                }
            }
        }
    }
    eligible
}
