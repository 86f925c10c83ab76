//! Building the assignment MILP and turning solver values back into an
//! assignment.
//!
//! One binary variable per (student, project) pair in the domain; ineligible
//! pairs get no variable at all. Hard constraints: every student exactly one
//! project, project capacities, supervisor student caps, and supervisor
//! project caps via indicator variables. Optionally a family of tie-aware
//! stability constraints that forbids every blocking configuration the
//! analyzer would flag.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};

use crate::error::AllocError;
use crate::problem::Problem;
use crate::solver::{LinearConstraint, MilpModel, MilpSolver, SolveOutcome};
use crate::{Assignment, SCORE_EPS};

/// Solver values this close to 1 count as selected.
const ALMOST_ONE: f64 = 0.99;

/// Mapping between (student, project) pairs and decision variable ids.
struct VarMap {
    pairs: Vec<(usize, usize)>,
    by_pair: HashMap<(usize, usize), usize>,
}

impl VarMap {
    fn var(&self, student: usize, project: usize) -> Option<usize> {
        self.by_pair.get(&(student, project)).copied()
    }
}

/// Build the assignment model and solve it. With `enforce_stability` the
/// model additionally excludes every assignment containing a blocking pair.
pub fn solve(
    problem: &Problem,
    solver: &dyn MilpSolver,
    enforce_stability: bool,
) -> Result<Assignment, AllocError> {
    check_obvious_infeasibility(problem)?;
    let (model, vars) = build(problem, enforce_stability);
    info!(
        "solving assignment model: {} variables, {} constraints, stability {}",
        model.n_vars(),
        model.n_constraints(),
        if enforce_stability { "enforced" } else { "not enforced" }
    );

    match solver.solve(&model, problem.config.solver_time_limit)? {
        SolveOutcome::Optimal(values) => Ok(extract(problem, &vars, &values)),
        SolveOutcome::Infeasible => Err(AllocError::Infeasible(if enforce_stability {
            "the capacity, eligibility and stability constraints admit no assignment".into()
        } else {
            "the capacity and eligibility constraints admit no assignment".into()
        })),
        SolveOutcome::TimedOut => Err(AllocError::Solver(
            "time limit reached without a proven optimum".into(),
        )),
    }
}

/// Cheap infeasibility diagnostics that name the violated constraint class,
/// before the solver gets to say a mere "no".
pub(crate) fn check_obvious_infeasibility(problem: &Problem) -> Result<(), AllocError> {
    let n_students = problem.n_students();
    let total_capacity: u64 = problem.projects.iter().map(|p| p.capacity as u64).sum();
    if total_capacity < n_students as u64 {
        return Err(AllocError::Infeasible(format!(
            "total project capacity {} is less than the {} students",
            total_capacity, n_students
        )));
    }
    for (s, student) in problem.students.iter().enumerate() {
        if !(0..problem.n_projects()).any(|p| problem.domain[[s, p]]) {
            return Err(AllocError::Infeasible(format!(
                "student {:?} has no project left to be assigned to \
                 (explicit_rank_only excludes everything)",
                student.id
            )));
        }
    }
    Ok(())
}

fn build(problem: &Problem, enforce_stability: bool) -> (MilpModel, VarMap) {
    let n_students = problem.n_students();
    let n_projects = problem.n_projects();
    let mut model = MilpModel::new();

    let mut pairs = Vec::new();
    let mut by_pair = HashMap::new();
    for s in 0..n_students {
        for p in 0..n_projects {
            if problem.domain[[s, p]] {
                let var = model.add_binary();
                debug_assert_eq!(var, pairs.len());
                pairs.push((s, p));
                by_pair.insert((s, p), var);
            }
        }
    }
    let vars = VarMap { pairs, by_pair };

    let objective: Vec<(usize, f64)> = vars
        .pairs
        .iter()
        .enumerate()
        .map(|(var, &(s, p))| (var, problem.scores.combined[[s, p]]))
        .collect();
    model.set_objective(objective);

    // Each student is assigned exactly one project.
    for s in 0..n_students {
        let terms: Vec<(usize, f64)> = (0..n_projects)
            .filter_map(|p| vars.var(s, p).map(|v| (v, 1.0)))
            .collect();
        model.add_constraint(LinearConstraint::eq(terms, 1.0));
    }

    // Project capacities.
    for (p, project) in problem.projects.iter().enumerate() {
        let terms: Vec<(usize, f64)> = (0..n_students)
            .filter_map(|s| vars.var(s, p).map(|v| (v, 1.0)))
            .collect();
        if !terms.is_empty() {
            model.add_constraint(LinearConstraint::le(terms, project.capacity as f64));
        }
    }

    // Supervisor student caps, over all their projects.
    for supervisor in &problem.supervisors {
        if let Some(cap) = supervisor.max_students {
            let terms: Vec<(usize, f64)> = vars
                .pairs
                .iter()
                .enumerate()
                .filter(|&(_, &(_, p))| {
                    problem.projects[p].supervisors.contains(&supervisor.index)
                })
                .map(|(var, _)| (var, 1.0))
                .collect();
            if !terms.is_empty() {
                model.add_constraint(LinearConstraint::le(terms, cap as f64));
            }
        }
    }

    // Supervisor project caps need to count projects that received anybody.
    // One indicator variable per relevant project; any assignment to the
    // project forces its indicator to 1 (x[s][p] - in_use[p] <= 0), and the
    // indicators of a supervisor's projects sum to at most the cap.
    let capped_supervisors: Vec<(usize, u32)> = problem
        .supervisors
        .iter()
        .filter_map(|v| v.max_projects.map(|cap| (v.index, cap)))
        .collect();
    if !capped_supervisors.is_empty() {
        let mut in_use: HashMap<usize, usize> = HashMap::new();
        for (p, project) in problem.projects.iter().enumerate() {
            if project
                .supervisors
                .iter()
                .any(|sv| capped_supervisors.iter().any(|&(capped, _)| capped == *sv))
            {
                let indicator = model.add_binary();
                in_use.insert(p, indicator);
                for s in 0..n_students {
                    if let Some(var) = vars.var(s, p) {
                        model.add_constraint(LinearConstraint::le(
                            vec![(var, 1.0), (indicator, -1.0)],
                            0.0,
                        ));
                    }
                }
            }
        }
        for &(sv, cap) in &capped_supervisors {
            let terms: Vec<(usize, f64)> = problem
                .projects
                .iter()
                .enumerate()
                .filter(|(_, project)| project.supervisors.contains(&sv))
                .filter_map(|(p, _)| in_use.get(&p).map(|&v| (v, 1.0)))
                .collect();
            if !terms.is_empty() {
                model.add_constraint(LinearConstraint::le(terms, cap as f64));
            }
        }
    }

    if enforce_stability {
        add_stability_constraints(problem, &vars, &mut model);
    }

    (model, vars)
}

/// Tie-aware stability constraints.
///
/// Two families, together excluding exactly the configurations the analyzer
/// flags as blocking pairs:
///
/// 1. Fullness: if student s ends up strictly worse than alternative p_alt,
///    then p_alt must be filled to capacity, else (s, p_alt) would block via
///    the free slot. `sum(x[*][p_alt]) >= capacity * sum(x[s][worse])`.
/// 2. Displacement (the formulation of the original custom method): s must
///    not sit strictly worse than p_alt while p_alt holds a student its
///    supervisors strictly disprefer to s: `x[s][p] + x[s2][p_alt] <= 1`.
///
/// Indifference never produces a constraint, which is what makes the family
/// sound under ties.
fn add_stability_constraints(problem: &Problem, vars: &VarMap, model: &mut MilpModel) {
    let n_students = problem.n_students();
    let n_projects = problem.n_projects();
    let student_scores = &problem.scores.student;
    let supervisor_scores = &problem.scores.supervisor;

    let mut n_fullness = 0usize;
    for s in 0..n_students {
        for alt in 0..n_projects {
            if !problem.domain[[s, alt]] {
                continue;
            }
            let alt_score = student_scores[[s, alt]];
            let worse: Vec<usize> = (0..n_projects)
                .filter(|&p| problem.domain[[s, p]])
                .filter(|&p| student_scores[[s, p]] > alt_score + SCORE_EPS)
                .filter_map(|p| vars.var(s, p))
                .collect();
            if worse.is_empty() {
                continue;
            }
            let capacity = problem.projects[alt].capacity as f64;
            let mut terms: Vec<(usize, f64)> = (0..n_students)
                .filter_map(|s2| vars.var(s2, alt).map(|v| (v, 1.0)))
                .collect();
            terms.extend(worse.into_iter().map(|v| (v, -capacity)));
            model.add_constraint(LinearConstraint::ge(terms, 0.0));
            n_fullness += 1;
        }
    }

    // Deduplicate: different (worse p) choices produce the same pair cut.
    let mut cuts: BTreeSet<(usize, usize)> = BTreeSet::new();
    for s in 0..n_students {
        for alt in 0..n_projects {
            if !problem.domain[[s, alt]] {
                continue;
            }
            let alt_score = student_scores[[s, alt]];
            let my_supervisor_score = supervisor_scores[[s, alt]];
            for p in 0..n_projects {
                if !problem.domain[[s, p]] || student_scores[[s, p]] <= alt_score + SCORE_EPS {
                    continue;
                }
                let var_s_p = match vars.var(s, p) {
                    Some(v) => v,
                    None => continue,
                };
                for s2 in 0..n_students {
                    if s2 == s || !problem.domain[[s2, alt]] {
                        continue;
                    }
                    if supervisor_scores[[s2, alt]] > my_supervisor_score + SCORE_EPS {
                        if let Some(var_s2_alt) = vars.var(s2, alt) {
                            cuts.insert((var_s_p, var_s2_alt));
                        }
                    }
                }
            }
        }
    }
    info!(
        "added {} fullness and {} unique displacement stability constraints",
        n_fullness,
        cuts.len()
    );
    for (a, b) in cuts {
        model.add_constraint(LinearConstraint::le(vec![(a, 1.0), (b, 1.0)], 1.0));
    }
}

fn extract(problem: &Problem, vars: &VarMap, values: &[f64]) -> Assignment {
    let mut assignment: Assignment = vec![None; problem.n_students()];
    for (var, &(s, p)) in vars.pairs.iter().enumerate() {
        if values[var] >= ALMOST_ONE {
            debug!(
                "assigning student {:?} to project {:?}",
                problem.students[s].id, problem.projects[p].id
            );
            assignment[s] = Some(p);
        }
    }
    assignment
}
