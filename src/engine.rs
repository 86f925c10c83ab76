//! The mode controller: one finite state machine deciding which algorithms
//! run and which single result comes out.
//!
//! States: Init -> TryStable -> TryUnconstrained -> Done | Failed. The
//! stable attempt first solves the MILP with stability constraints (optimal
//! among the stable assignments), then falls back to the constructive
//! deferred-acceptance rounds; every candidate is re-checked by the analyzer
//! before it may carry the stable-achieved tag. Under the require-stable
//! policy a failed attempt ends the run with the blocking pairs of the last
//! candidate; under prefer-stable the machine moves on to unconstrained
//! minimization and tags the result honestly.

use log::{info, warn};

use crate::config::StabilityPolicy;
use crate::deferred;
use crate::error::AllocError;
use crate::model;
use crate::problem::Problem;
use crate::solution::{ModeOutcome, Solution};
use crate::solver::{DefaultSolver, MilpSolver};
use crate::stability::{self, BlockingPair};

enum State {
    Init,
    TryStable,
    TryUnconstrained,
    Done(Solution),
    Failed(AllocError),
}

enum StableAttempt {
    Achieved(Solution),
    Unachievable(Vec<BlockingPair>),
}

/// Solve the problem with the bundled solver backend.
pub fn solve(problem: &Problem) -> Result<Solution, AllocError> {
    solve_with(problem, &DefaultSolver)
}

/// Solve the problem with a caller-provided solver backend.
pub fn solve_with(problem: &Problem, solver: &dyn MilpSolver) -> Result<Solution, AllocError> {
    let mut state = State::Init;
    loop {
        state = match state {
            State::Init => {
                // Determinable infeasibility is an Infeasible error under
                // every policy, not a failed stability attempt.
                model::check_obvious_infeasibility(problem)?;
                match problem.config.stability_policy {
                    StabilityPolicy::MinimizeOnly => State::TryUnconstrained,
                    StabilityPolicy::RequireStable | StabilityPolicy::PreferStableFallback => {
                        State::TryStable
                    }
                }
            }

            State::TryStable => match try_stable(problem, solver)? {
                StableAttempt::Achieved(solution) => State::Done(solution),
                StableAttempt::Unachievable(blocking) => {
                    match problem.config.stability_policy {
                        StabilityPolicy::RequireStable => {
                            State::Failed(AllocError::StabilityUnachievable(blocking))
                        }
                        _ => {
                            warn!(
                                "no fully stable assignment; falling back to \
                                 unconstrained minimization"
                            );
                            State::TryUnconstrained
                        }
                    }
                }
            },

            State::TryUnconstrained => {
                let assignment = model::solve(problem, solver, false)?;
                let report = stability::analyze(problem, &assignment);
                let outcome = if report.is_stable() {
                    ModeOutcome::StableAchieved
                } else {
                    warn!(
                        "result contains {} blocking pair(s); stability was not enforced",
                        report.blocking.len()
                    );
                    ModeOutcome::UnstableFallback
                };
                State::Done(Solution::assemble(problem, assignment, report, outcome))
            }

            State::Done(solution) => {
                info!(
                    "final solution: outcome {}, objective {}",
                    solution.outcome(),
                    solution.objective()
                );
                return Ok(solution);
            }
            State::Failed(error) => return Err(error),
        };
    }
}

/// One stable attempt: constrained MILP first, constructive rounds second.
/// Solver failures propagate; constrained infeasibility does not (the
/// constructive algorithm may still succeed, and the policy decides what a
/// full failure means).
fn try_stable(
    problem: &Problem,
    solver: &dyn MilpSolver,
) -> Result<StableAttempt, AllocError> {
    let mut last_blocking = Vec::new();

    match model::solve(problem, solver, true) {
        Ok(assignment) => {
            let report = stability::analyze(problem, &assignment);
            if report.is_stable() {
                info!("stability-constrained model produced a verified stable assignment");
                return Ok(StableAttempt::Achieved(Solution::assemble(
                    problem,
                    assignment,
                    report,
                    ModeOutcome::StableAchieved,
                )));
            }
            // Possible when supervisor caps interact with the constraint
            // families; the analyzer is the arbiter, so this candidate does
            // not count as stable.
            warn!(
                "stability-constrained model left {} blocking pair(s); \
                 trying the constructive algorithm",
                report.blocking.len()
            );
            last_blocking = report.blocking;
        }
        Err(AllocError::Infeasible(reason)) => {
            info!(
                "stability-constrained model is infeasible ({}); \
                 trying the constructive algorithm",
                reason
            );
        }
        Err(other) => return Err(other),
    }

    let outcome = deferred::solve(problem);
    let report = stability::analyze(problem, &outcome.assignment);
    if outcome.unplaced.is_empty() && report.is_stable() {
        info!("constructive algorithm produced a verified stable assignment");
        return Ok(StableAttempt::Achieved(Solution::assemble(
            problem,
            outcome.assignment,
            report,
            ModeOutcome::StableAchieved,
        )));
    }
    if !outcome.unplaced.is_empty() {
        let names: Vec<&str> = outcome
            .unplaced
            .iter()
            .map(|&s| problem.students[s].id.as_str())
            .collect();
        warn!(
            "constructive algorithm could not place: {}",
            names.join(", ")
        );
    }
    if !report.blocking.is_empty() {
        warn!(
            "constructive candidate has {} residual blocking pair(s)",
            report.blocking.len()
        );
        last_blocking = report.blocking;
    }
    Ok(StableAttempt::Unachievable(last_blocking))
}

#[cfg(test)]
mod tests;
