use crate::config::{Config, StabilityPolicy};
use crate::deferred;
use crate::engine;
use crate::error::AllocError;
use crate::problem::Problem;
use crate::solution::ModeOutcome;
use crate::stability::{self, BlockingPair, BlockingTrigger};
use crate::{Assignment, Project, ProjectRanking, RankEntry, Student, Supervisor};

fn student(id: &str, ranks: &[(usize, f64)]) -> Student {
    Student {
        index: 0,
        id: id.into(),
        name: id.to_uppercase(),
        ranks: ranks
            .iter()
            .map(|&(target, rank)| RankEntry { target, rank })
            .collect(),
        notation: None,
    }
}

fn project(id: &str, capacity: u32, supervisors: Vec<usize>) -> Project {
    Project {
        index: 0,
        id: id.into(),
        title: id.to_uppercase(),
        capacity,
        supervisors,
    }
}

fn supervisor(id: &str, rankings: Vec<ProjectRanking>) -> Supervisor {
    Supervisor {
        index: 0,
        id: id.into(),
        name: id.to_uppercase(),
        max_students: None,
        max_projects: None,
        rankings,
    }
}

fn ranking(project: usize, ranks: &[(usize, f64)]) -> ProjectRanking {
    ProjectRanking {
        project,
        ranks: ranks
            .iter()
            .map(|&(target, rank)| RankEntry { target, rank })
            .collect(),
        notation: None,
    }
}

/// Ten students, ten projects of capacity one, an indifferent supervisor.
/// Students rank three projects each; the overlaps are arranged so that a
/// greedy assignment can strand s07 while p03 stays open.
fn ten_by_ten() -> (Vec<Supervisor>, Vec<Project>, Vec<Student>) {
    let supervisors = vec![supervisor("v01", vec![])];
    let projects: Vec<Project> = (1..=10)
        .map(|i| project(&format!("p{:02}", i), 1, vec![0]))
        .collect();
    // Choice triples, as input project indexes (p01 -> 0).
    let choices: [[usize; 3]; 10] = [
        [0, 1, 2], // s01
        [0, 1, 2], // s02
        [3, 4, 5], // s03
        [3, 4, 5], // s04
        [6, 7, 8], // s05
        [6, 7, 8], // s06
        [1, 2, 9], // s07
        [8, 9, 0], // s08
        [7, 8, 9], // s09
        [4, 5, 6], // s10
    ];
    let students: Vec<Student> = choices
        .iter()
        .enumerate()
        .map(|(i, picks)| {
            let ranks: Vec<(usize, f64)> = picks
                .iter()
                .enumerate()
                .map(|(position, &p)| (p, (position + 1) as f64))
                .collect();
            student(&format!("s{:02}", i + 1), &ranks)
        })
        .collect();
    (supervisors, projects, students)
}

fn ten_by_ten_problem(config: Config) -> Problem {
    let (supervisors, projects, students) = ten_by_ten();
    Problem::new(supervisors, projects, students, None, config).unwrap()
}

/// Build an assignment from (student id, project id) pairs; students not
/// listed stay unassigned.
fn assignment_by_ids(problem: &Problem, pairs: &[(&str, &str)]) -> Assignment {
    let mut assignment: Assignment = vec![None; problem.n_students()];
    for &(student_id, project_id) in pairs {
        let s = problem.student_index(student_id).expect(student_id);
        let p = problem.project_index(project_id).expect(project_id);
        assignment[s] = Some(p);
    }
    assignment
}

#[test]
fn stranding_a_student_next_to_an_open_project_is_unstable() {
    let problem = ten_by_ten_problem(Config::default());
    // A dissatisfaction-minimal-looking assignment that leaves s07 without a
    // project while p03 sits empty.
    let naive = assignment_by_ids(
        &problem,
        &[
            ("s01", "p01"),
            ("s02", "p02"),
            ("s03", "p04"),
            ("s04", "p05"),
            ("s05", "p07"),
            ("s06", "p08"),
            ("s08", "p09"),
            ("s09", "p10"),
            ("s10", "p06"),
        ],
    );

    let report = stability::analyze(&problem, &naive);
    let s07 = problem.student_index("s07").unwrap();
    let p03 = problem.project_index("p03").unwrap();
    assert_eq!(
        report.blocking,
        vec![BlockingPair {
            student: s07,
            current: None,
            alternative: p03,
            trigger: BlockingTrigger::OpenCapacity,
        }]
    );
}

#[test]
fn complete_assignment_of_the_same_instance_is_stable() {
    let problem = ten_by_ten_problem(Config::default());
    let full = assignment_by_ids(
        &problem,
        &[
            ("s01", "p01"),
            ("s02", "p02"),
            ("s07", "p03"),
            ("s03", "p04"),
            ("s04", "p05"),
            ("s10", "p06"),
            ("s05", "p07"),
            ("s06", "p08"),
            ("s08", "p09"),
            ("s09", "p10"),
        ],
    );
    assert!(stability::analyze(&problem, &full).is_stable());
}

#[test]
fn deferred_acceptance_places_all_ten_students() {
    let problem = ten_by_ten_problem(Config::default());
    let outcome = deferred::solve(&problem);
    assert!(outcome.unplaced.is_empty());
    assert!(stability::analyze(&problem, &outcome.assignment).is_stable());
}

#[test]
fn require_stable_succeeds_on_the_ten_by_ten_instance() {
    let config = Config {
        stability_policy: StabilityPolicy::RequireStable,
        ..Config::default()
    };
    let problem = ten_by_ten_problem(config);
    let solution = engine::solve(&problem).unwrap();
    assert_eq!(solution.outcome(), ModeOutcome::StableAchieved);
    assert!(solution.unassigned().is_empty());
    assert!(solution.stability().is_stable());
}

#[test]
fn ample_capacity_without_restrictions_is_always_feasible() {
    let config = Config {
        stability_policy: StabilityPolicy::MinimizeOnly,
        ..Config::default()
    };
    let problem = ten_by_ten_problem(config);
    let solution = engine::solve(&problem).unwrap();
    assert!(solution.unassigned().is_empty());
    assert!(solution.objective().is_finite());
}

#[test]
fn reordered_input_with_the_same_seed_is_bit_identical() {
    let (supervisors, projects, students) = ten_by_ten();
    let mut students_reversed = students.clone();
    students_reversed.reverse();
    // Rank entries reference projects, not students, so reversing the
    // student rows is enough to scramble the input order.
    let problem_a = Problem::new(
        supervisors.clone(),
        projects.clone(),
        students,
        None,
        Config::default(),
    )
    .unwrap();
    let problem_b = Problem::new(
        supervisors,
        projects,
        students_reversed,
        None,
        Config::default(),
    )
    .unwrap();

    let solution_a = engine::solve(&problem_a).unwrap();
    let solution_b = engine::solve(&problem_b).unwrap();

    assert_eq!(solution_a, solution_b);
    assert_eq!(
        solution_a.objective().to_bits(),
        solution_b.objective().to_bits()
    );
    let ids = |problem: &Problem, solution: &crate::solution::Solution| -> Vec<(String, String)> {
        solution
            .rows(problem)
            .iter()
            .map(|r| {
                (
                    problem.students[r.student].id.clone(),
                    problem.projects[r.project].id.clone(),
                )
            })
            .collect()
    };
    assert_eq!(ids(&problem_a, &solution_a), ids(&problem_b, &solution_b));
}

/// s1 only ranked p1, s2 ranked p1 then p2, and the supervisor strictly
/// prefers s2. Every complete assignment has a blocking pair, and every
/// stable matching leaves s1 out.
fn no_stable_full_assignment(policy: StabilityPolicy) -> Problem {
    let config = Config {
        stability_policy: policy,
        explicit_rank_only: true,
        ..Config::default()
    };
    Problem::new(
        vec![supervisor(
            "v1",
            vec![ranking(0, &[(0, 2.0), (1, 1.0)]), ranking(1, &[(1, 1.0)])],
        )],
        vec![project("p1", 1, vec![0]), project("p2", 1, vec![0])],
        vec![
            student("s1", &[(0, 1.0)]),
            student("s2", &[(0, 1.0), (1, 2.0)]),
        ],
        None,
        config,
    )
    .unwrap()
}

#[test]
fn require_stable_fails_when_stability_is_unachievable() {
    let problem = no_stable_full_assignment(StabilityPolicy::RequireStable);
    let result = engine::solve(&problem);
    assert!(matches!(
        result,
        Err(AllocError::StabilityUnachievable(_))
    ));
}

#[test]
fn prefer_stable_falls_back_and_tags_the_result() {
    let problem = no_stable_full_assignment(StabilityPolicy::PreferStableFallback);
    let solution = engine::solve(&problem).unwrap();
    assert_eq!(solution.outcome(), ModeOutcome::UnstableFallback);
    assert!(solution.unassigned().is_empty());
    assert!(!solution.stability().is_stable());
}

#[test]
fn minimize_only_reports_incidental_stability() {
    // First choices all around: the unconstrained optimum happens to be
    // stable and is tagged as such.
    let problem = Problem::new(
        vec![supervisor("v1", vec![])],
        vec![project("p1", 1, vec![0]), project("p2", 1, vec![0])],
        vec![
            student("s1", &[(0, 1.0), (1, 2.0)]),
            student("s2", &[(1, 1.0), (0, 2.0)]),
        ],
        None,
        Config {
            stability_policy: StabilityPolicy::MinimizeOnly,
            ..Config::default()
        },
    )
    .unwrap();
    let solution = engine::solve(&problem).unwrap();
    assert_eq!(solution.outcome(), ModeOutcome::StableAchieved);
}

#[test]
fn validation_reports_every_defect_at_once() {
    let config = Config {
        student_weight: 0.5,
        supervisor_weight: 0.2,
        ..Config::default()
    };
    let result = Problem::new(
        vec![supervisor("v1", vec![])],
        vec![project("p1", 0, vec![0])],
        vec![student("dup", &[]), student("dup", &[])],
        None,
        config,
    );
    match result {
        Err(AllocError::Validation(errors)) => {
            // Bad weights, zero capacity, duplicate student id.
            assert!(errors.len() >= 3, "only got {:?}", errors);
        }
        other => panic!("expected a validation failure, got {:?}", other.is_ok()),
    }
}
