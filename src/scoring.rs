//! Pairwise dissatisfaction scores, derived once from the raw ranks.
//!
//! Three matrices, all indexed `[student, project]`: the student's canonical
//! score for the project, the project's canonical score for the student
//! (the mean over the project's supervisors, each normalized over the
//! project's eligible students), and the combined objective cost
//! `student_weight * s^e + supervisor_weight * v^e`. Stability reasoning uses
//! the two canonical matrices; only the optimizer looks at the combined one.
//!
//! Ineligible pairs carry an infinite sentinel. They are excluded from the
//! assignment domain outright, so the sentinel is never summed into an
//! objective; it only makes accidental use impossible to miss.

use ndarray::Array2;

use crate::config::Config;
use crate::error::{ValidationError, ValidationErrorKind};
use crate::preferences::Preferences;
use crate::{Project, Student, Supervisor};

#[derive(Debug)]
pub struct Scores {
    /// Canonical dissatisfaction of each student with each project.
    pub student: Array2<f64>,
    /// Canonical dissatisfaction of each project (its supervisors' mean)
    /// with each student.
    pub supervisor: Array2<f64>,
    /// Weighted, exponentiated cost used as the optimization objective.
    pub combined: Array2<f64>,
}

impl Scores {
    /// Derive all three matrices. Rank defects of every rater are collected
    /// and reported together.
    pub fn compute(
        config: &Config,
        supervisors: &[Supervisor],
        projects: &[Project],
        students: &[Student],
        eligible: &Array2<bool>,
    ) -> Result<Scores, Vec<ValidationError>> {
        let n_students = students.len();
        let n_projects = projects.len();
        let shape = (n_students, n_projects);
        let mut errors = Vec::new();

        let mut student_scores = Array2::from_elem(shape, f64::INFINITY);
        for (s, student) in students.iter().enumerate() {
            let notation = student.notation.unwrap_or(config.rank_notation);
            let n_eligible = (0..n_projects).filter(|&p| eligible[[s, p]]).count();
            let entries: Vec<(usize, f64)> =
                student.ranks.iter().map(|e| (e.target, e.rank)).collect();
            match Preferences::new(n_eligible, &entries, notation) {
                Ok(prefs) => {
                    for p in 0..n_projects {
                        if eligible[[s, p]] {
                            student_scores[[s, p]] = prefs.score(p);
                        }
                    }
                }
                Err(e) => errors.push(ValidationError::new(
                    ValidationErrorKind::BadRank,
                    format!("student {:?}: {}", student.id, e),
                )),
            }
        }

        // Per project: one normalized score set per supervisor, then the
        // mean. Each supervisor's set satisfies the budget invariant over the
        // project's eligible students on its own, so the mean does too.
        let mut supervisor_scores = Array2::from_elem(shape, f64::INFINITY);
        for (p, project) in projects.iter().enumerate() {
            let eligible_students: Vec<usize> =
                (0..n_students).filter(|&s| eligible[[s, p]]).collect();
            if eligible_students.is_empty() {
                continue;
            }
            let mut sums = vec![0.0f64; n_students];
            let mut ok = true;
            for &sv in &project.supervisors {
                let supervisor = &supervisors[sv];
                let ranking = supervisor.rankings.iter().find(|r| r.project == p);
                let entries: Vec<(usize, f64)> = ranking
                    .map(|r| r.ranks.iter().map(|e| (e.target, e.rank)).collect())
                    .unwrap_or_default();
                let notation = ranking
                    .and_then(|r| r.notation)
                    .unwrap_or(config.rank_notation);
                match Preferences::new(eligible_students.len(), &entries, notation) {
                    Ok(prefs) => {
                        for &s in &eligible_students {
                            sums[s] += prefs.score(s);
                        }
                    }
                    Err(e) => {
                        ok = false;
                        errors.push(ValidationError::new(
                            ValidationErrorKind::BadRank,
                            format!(
                                "supervisor {:?}, project {:?}: {}",
                                supervisor.id, project.id, e
                            ),
                        ));
                    }
                }
            }
            if ok {
                let n_sups = project.supervisors.len() as f64;
                for &s in &eligible_students {
                    supervisor_scores[[s, p]] = sums[s] / n_sups;
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let exponent = config.dissatisfaction_exponent;
        let mut combined = Array2::from_elem(shape, f64::INFINITY);
        for s in 0..n_students {
            for p in 0..n_projects {
                if eligible[[s, p]] {
                    combined[[s, p]] = config.student_weight
                        * student_scores[[s, p]].powf(exponent)
                        + config.supervisor_weight * supervisor_scores[[s, p]].powf(exponent);
                }
            }
        }

        Ok(Scores {
            student: student_scores,
            supervisor: supervisor_scores,
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use ndarray::Array2;

    use super::*;
    use crate::preferences::RankNotation;
    use crate::{ProjectRanking, RankEntry};

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

    fn project(id: &str, supervisors: Vec<usize>) -> Project {
        Project {
            index: 0,
            id: id.into(),
            title: id.to_uppercase(),
            capacity: 1,
            supervisors,
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

    fn all_eligible(n_students: usize, n_projects: usize) -> Array2<bool> {
        Array2::from_elem((n_students, n_projects), true)
    }

    #[test]
    fn student_rows_satisfy_the_budget() {
        let students = vec![
            student("s1", &[(0, 1.0), (1, 2.0)]),
            student("s2", &[]),
        ];
        let projects = vec![project("p1", vec![0]), project("p2", vec![0]), project("p3", vec![0])];
        let sups = vec![supervisor("v1", vec![])];
        let scores = Scores::compute(
            &Config::default(),
            &sups,
            &projects,
            &students,
            &all_eligible(2, 3),
        )
        .unwrap();

        for s in 0..2 {
            let total: f64 = (0..3).map(|p| scores.student[[s, p]]).sum();
            assert_float_absolute_eq!(total, 6.0);
        }
        // Student without any ranks holds every project at the mean rank.
        assert_float_absolute_eq!(scores.student[[1, 0]], 2.0);
    }

    #[test]
    fn multi_supervisor_score_is_the_mean() {
        // v1 prefers s1, v2 prefers s2; the project as a whole is indifferent.
        let students = vec![student("s1", &[]), student("s2", &[])];
        let projects = vec![project("p1", vec![0, 1])];
        let sups = vec![
            supervisor("v1", vec![ranking(0, &[(0, 1.0), (1, 2.0)])]),
            supervisor("v2", vec![ranking(0, &[(0, 2.0), (1, 1.0)])]),
        ];
        let scores = Scores::compute(
            &Config::default(),
            &sups,
            &projects,
            &students,
            &all_eligible(2, 1),
        )
        .unwrap();
        assert_float_absolute_eq!(scores.supervisor[[0, 0]], 1.5);
        assert_float_absolute_eq!(scores.supervisor[[1, 0]], 1.5);
        // The mean preserves the per-project budget.
        assert_float_absolute_eq!(
            scores.supervisor[[0, 0]] + scores.supervisor[[1, 0]],
            3.0
        );
    }

    #[test]
    fn combined_applies_weights() {
        let students = vec![student("s1", &[(0, 1.0), (1, 2.0)])];
        let projects = vec![project("p1", vec![0]), project("p2", vec![0])];
        let sups = vec![supervisor("v1", vec![ranking(0, &[(0, 1.0)]), ranking(1, &[(0, 1.0)])])];
        let config = Config {
            student_weight: 0.7,
            supervisor_weight: 0.3,
            ..Config::default()
        };
        let scores =
            Scores::compute(&config, &sups, &projects, &students, &all_eligible(1, 2)).unwrap();
        // Single eligible student: supervisor score is 1 everywhere.
        assert_float_absolute_eq!(scores.combined[[0, 0]], 0.7 * 1.0 + 0.3 * 1.0);
        assert_float_absolute_eq!(scores.combined[[0, 1]], 0.7 * 2.0 + 0.3 * 1.0);
    }

    #[test]
    fn higher_exponent_punishes_one_large_dissatisfaction() {
        // Same total dissatisfaction either way: one rank-3 plus one rank-1,
        // versus two rank-2s. The exponent decides which is worse.
        let linear = Config::default();
        let quadratic = Config {
            dissatisfaction_exponent: 2.0,
            ..Config::default()
        };
        let cost = |config: &Config, rank: f64| -> f64 {
            config.student_weight * rank.powf(config.dissatisfaction_exponent)
        };

        let lopsided_linear = cost(&linear, 3.0) + cost(&linear, 1.0);
        let balanced_linear = cost(&linear, 2.0) + cost(&linear, 2.0);
        assert_float_absolute_eq!(lopsided_linear, balanced_linear);

        let lopsided_quadratic = cost(&quadratic, 3.0) + cost(&quadratic, 1.0);
        let balanced_quadratic = cost(&quadratic, 2.0) + cost(&quadratic, 2.0);
        assert!(lopsided_quadratic > balanced_quadratic);
    }

    #[test]
    fn ineligible_pairs_are_marked_unusable() {
        let students = vec![student("s1", &[(0, 1.0)])];
        let projects = vec![project("p1", vec![0]), project("p2", vec![0])];
        let sups = vec![supervisor("v1", vec![])];
        let mut eligible = all_eligible(1, 2);
        eligible[[0, 1]] = false;
        let scores =
            Scores::compute(&Config::default(), &sups, &projects, &students, &eligible).unwrap();
        assert!(scores.student[[0, 1]].is_infinite());
        assert!(scores.supervisor[[0, 1]].is_infinite());
        assert!(scores.combined[[0, 1]].is_infinite());
        // The eligible pair is normalized over a single option.
        assert_float_absolute_eq!(scores.student[[0, 0]], 1.0);
    }

    #[test]
    fn rank_errors_are_accumulated_across_raters() {
        let students = vec![
            student("s1", &[(0, 2.0)]),            // not from the top
            student("s2", &[(0, 1.0), (1, 3.0)]),  // gap
        ];
        let projects = vec![project("p1", vec![0]), project("p2", vec![0])];
        let sups = vec![supervisor("v1", vec![])];
        let errors = Scores::compute(
            &Config::default(),
            &sups,
            &projects,
            &students,
            &all_eligible(2, 2),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
