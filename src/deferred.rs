//! Constructive stability enforcement: deferred acceptance, adapted for
//! tied preferences.
//!
//! Classical deferred acceptance assumes strict preferences and is undefined
//! on ties. The adaptation here: a newly arriving proposer displaces a
//! currently held student only when the project strictly prefers the
//! newcomer. On indifference the earlier-arrived student keeps the slot, so
//! the deterministic processing order (see [`crate::shuffle`]) decides every
//! tie and the run is reproducible. Source material left displacement under
//! tied supervisor preferences unspecified; never-displace-on-ties is this
//! crate's deliberate, deterministic choice.
//!
//! Students propose in the fixed order, each to its most preferred remaining
//! project of its domain (ties in a student's own list broken by canonical
//! project order). A project holds up to `capacity` proposers; supervisor
//! student caps and project caps restrict acceptance further. A displaced
//! student re-enters the queue and continues down its list. Every student
//! proposes to every domain project at most once, which bounds the run.
//!
//! The procedure may end with students left unplaced (no full stable
//! assignment exists, for instance when capacities are short). They are
//! reported to the caller; deciding whether to fall back is the mode
//! controller's job, not this module's.

use std::collections::VecDeque;

use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::problem::Problem;
use crate::stability::{compare, Leaning};
use crate::Assignment;

/// What the proposal rounds produced.
pub struct DeferredOutcome {
    pub assignment: Assignment,
    /// Students rejected by every project of their domain, in canonical
    /// order. Empty on full success.
    pub unplaced: Vec<usize>,
}

/// Run the proposal rounds to completion.
pub fn solve(problem: &Problem) -> DeferredOutcome {
    let n_students = problem.n_students();
    let n_projects = problem.n_projects();
    let student_scores = &problem.scores.student;
    let supervisor_scores = &problem.scores.supervisor;

    // Proposal lists: each student's domain projects, best first.
    let preference_lists: Vec<Vec<usize>> = (0..n_students)
        .map(|s| {
            let mut list: Vec<usize> =
                (0..n_projects).filter(|&p| problem.domain[[s, p]]).collect();
            list.sort_by_key(|&p| (OrderedFloat(student_scores[[s, p]]), p));
            list
        })
        .collect();

    let mut next_proposal = vec![0usize; n_students];
    let mut held: Vec<Vec<usize>> = vec![Vec::new(); n_projects];
    let mut place_of: Vec<Option<usize>> = vec![None; n_students];
    let mut supervisor_load = vec![0u32; problem.supervisors.len()];
    let mut active_projects = vec![0u32; problem.supervisors.len()];
    // Arrival stamps decide who the "earlier" student is among equally
    // disliked holders.
    let mut arrival = vec![0u64; n_students];
    let mut clock = 0u64;

    let mut queue: VecDeque<usize> = (0..n_students).collect();
    while let Some(s) = queue.pop_front() {
        debug_assert!(place_of[s].is_none());
        while next_proposal[s] < preference_lists[s].len() {
            let p = preference_lists[s][next_proposal[s]];
            next_proposal[s] += 1;
            let project = &problem.projects[p];

            let has_free_slot = (held[p].len() as u32) < project.capacity;
            let supervisors_have_room = project.supervisors.iter().all(|&sv| {
                match problem.supervisors[sv].max_students {
                    Some(cap) => supervisor_load[sv] < cap,
                    None => true,
                }
            });
            let would_activate = held[p].is_empty();
            let activation_ok = !would_activate
                || project.supervisors.iter().all(|&sv| {
                    match problem.supervisors[sv].max_projects {
                        Some(cap) => active_projects[sv] < cap,
                        None => true,
                    }
                });

            if has_free_slot && supervisors_have_room && activation_ok {
                debug!(
                    "student {:?} is held by project {:?}",
                    problem.students[s].id, project.id
                );
                held[p].push(s);
                place_of[s] = Some(p);
                arrival[s] = clock;
                clock += 1;
                for &sv in &project.supervisors {
                    supervisor_load[sv] += 1;
                    if would_activate {
                        active_projects[sv] += 1;
                    }
                }
                break;
            }

            // The project cannot take one more student. Swapping out a held
            // student keeps occupancy and supervisor loads unchanged, so it
            // is allowed even when a supervisor cap is the binding limit.
            // The candidate is the held student the project likes least;
            // among equally disliked ones, the latest arrival.
            let victim = held[p]
                .iter()
                .copied()
                .max_by_key(|&w| (OrderedFloat(supervisor_scores[[w, p]]), arrival[w]));
            let victim = match victim {
                Some(w) => w,
                None => continue,
            };
            if compare(supervisor_scores[[s, p]], supervisor_scores[[victim, p]])
                == Leaning::StrictlyPrefers
            {
                debug!(
                    "project {:?} drops student {:?} for strictly preferred {:?}",
                    project.id, problem.students[victim].id, problem.students[s].id
                );
                held[p].retain(|&w| w != victim);
                held[p].push(s);
                place_of[victim] = None;
                place_of[s] = Some(p);
                arrival[s] = clock;
                clock += 1;
                queue.push_back(victim);
                break;
            }
            // Rejected (the project is indifferent or worse): try the next
            // project on the list.
        }
    }

    let unplaced: Vec<usize> = (0..n_students).filter(|&s| place_of[s].is_none()).collect();
    if unplaced.is_empty() {
        info!("deferred acceptance placed all {} students", n_students);
    } else {
        info!(
            "deferred acceptance left {} of {} students unplaced",
            unplaced.len(),
            n_students
        );
    }
    DeferredOutcome {
        assignment: place_of,
        unplaced,
    }
}
