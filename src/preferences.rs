//! Rank normalization: raw preference ranks in any supported notation are
//! converted into canonical fractional dissatisfaction scores.
//!
//! A rater expresses ranks over the targets it is eligible for (1 = most
//! preferred). Ties can be written in three notations: fractional (tied
//! targets share the mean of the ranks they jointly occupy, e.g. 1.5, 1.5, 3),
//! competition (all tied targets get the lowest occupied rank, e.g. 1, 1, 3)
//! and dense (tied targets get the next unused small integer, e.g. 1, 1, 2).
//! Everything is converted to fractional before any further use: only the
//! fractional notation preserves the rank sum, so every rater spends the same
//! total dissatisfaction budget no matter how many ties it declares. Feeding
//! competition or dense ranks into the optimizer directly would favour raters
//! with many ties.
//!
//! Eligible targets without an explicit rank share the unspent budget
//! equally. The invariant is that for M eligible targets the canonical scores
//! always sum to M(M+1)/2.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SCORE_EPS;

/// Notation used to express tied ranks. See the module documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankNotation {
    Fractional,
    Competition,
    Dense,
}

/// A defect in a rater's rank list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("rank {rank} is not a positive number")]
    NonPositive { rank: f64 },
    #[error("competition rank {rank} must be an integer in [1, {max}]")]
    BadCompetitionRank { rank: f64, max: usize },
    #[error("dense rank {rank} must be an integer in [1, {max}]")]
    BadDenseRank { rank: f64, max: usize },
    #[error(
        "the {n} explicit ranks must occupy the top ranks contiguously \
         (sum {expected}, got {actual})"
    )]
    NonContiguous { n: usize, expected: f64, actual: f64 },
    #[error("rank {rank} exceeds the {n} rankable targets")]
    OutOfRange { rank: f64, n: usize },
    #[error("the same target is ranked more than once")]
    DuplicateTarget,
}

/// Convert a list of raw ranks into fractional notation.
///
/// The list holds only the explicitly expressed ranks of a rater, in input
/// order. Validates the notation-specific rules and, after conversion, that
/// the ranks occupy the top of the scale contiguously: k explicit ranks must
/// sum to k(k+1)/2.
pub fn to_fractional(ranks: &[f64], notation: RankNotation) -> Result<Vec<f64>, RankError> {
    for &r in ranks {
        if !(r > 0.0) {
            // Also catches NaN.
            return Err(RankError::NonPositive { rank: r });
        }
    }
    let n = ranks.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let fractional = match notation {
        RankNotation::Fractional => ranks.to_vec(),
        RankNotation::Competition => {
            // 1, 1, 3 -> 1.5, 1.5, 3: three targets sharing rank x occupy
            // ranks x, x+1, x+2 and each gets the mean.
            let mut out = Vec::with_capacity(n);
            for &r in ranks {
                if r.fract() != 0.0 || r < 1.0 || r > n as f64 {
                    return Err(RankError::BadCompetitionRank { rank: r, max: n });
                }
                let c = ranks.iter().filter(|&&x| x == r).count() as f64;
                out.push(r + (c - 1.0) / 2.0);
            }
            out
        }
        RankNotation::Dense => {
            // 1, 1, 2 -> 1.5, 1.5, 3: a dense rank says nothing about how
            // many ranks the ties above it consumed, so count them.
            let mut distinct: Vec<f64> = ranks.to_vec();
            distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            distinct.dedup();
            let max = distinct.len();
            let mut out = Vec::with_capacity(n);
            for &r in ranks {
                if r.fract() != 0.0 || r < 1.0 || r > max as f64 {
                    return Err(RankError::BadDenseRank { rank: r, max });
                }
                let c = ranks.iter().filter(|&&x| x == r).count() as f64;
                let below = ranks.iter().filter(|&&x| x < r).count() as f64;
                out.push(below + (c + 1.0) / 2.0);
            }
            out
        }
    };

    let actual: f64 = fractional.iter().sum();
    let expected = (n * (n + 1)) as f64 / 2.0;
    if (actual - expected).abs() > SCORE_EPS {
        return Err(RankError::NonContiguous {
            n,
            expected,
            actual,
        });
    }
    Ok(fractional)
}

/// Canonical preferences of one rater over its eligible target set.
///
/// Targets are identified by their index in the global entity list, but the
/// number of options and the dissatisfaction budget refer to the rater's
/// eligible targets only.
#[derive(Debug, Clone)]
pub struct Preferences {
    n_options: usize,
    explicit: BTreeMap<usize, f64>,
    unranked: Option<f64>,
}

impl Preferences {
    /// Build canonical preferences from explicit `(target, raw rank)` entries.
    ///
    /// `n_options` is the number of eligible targets; entries for ineligible
    /// targets must have been rejected by the caller beforehand.
    pub fn new(
        n_options: usize,
        entries: &[(usize, f64)],
        notation: RankNotation,
    ) -> Result<Preferences, RankError> {
        let raw: Vec<f64> = entries.iter().map(|&(_, r)| r).collect();
        let fractional = to_fractional(&raw, notation)?;

        let mut explicit = BTreeMap::new();
        let mut allocated = 0.0;
        for (&(target, _), &rank) in entries.iter().zip(fractional.iter()) {
            if rank > n_options as f64 + SCORE_EPS {
                return Err(RankError::OutOfRange {
                    rank,
                    n: n_options,
                });
            }
            if explicit.insert(target, rank).is_some() {
                return Err(RankError::DuplicateTarget);
            }
            allocated += rank;
        }

        let n_unranked = n_options - explicit.len();
        let total = (n_options * (n_options + 1)) as f64 / 2.0;
        let unranked = if n_unranked > 0 {
            Some((total - allocated) / n_unranked as f64)
        } else {
            None
        };

        Ok(Preferences {
            n_options,
            explicit,
            unranked,
        })
    }

    /// Dissatisfaction score for an eligible target: its explicit canonical
    /// rank, or the equal share of the unspent budget.
    pub fn score(&self, target: usize) -> f64 {
        match self.explicit.get(&target) {
            Some(&rank) => rank,
            // The unwrap cannot fire for eligible targets: `unranked` is only
            // None when every option carries an explicit rank.
            None => self.unranked.unwrap_or(f64::INFINITY),
        }
    }

    /// Did the rater actively express a rank for this target?
    pub fn is_explicit(&self, target: usize) -> bool {
        self.explicit.contains_key(&target)
    }

    /// Number of eligible targets this rater scores over.
    pub fn n_options(&self) -> usize {
        self.n_options
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    #[test]
    fn conversion_to_fractional() {
        // (fractional, competition, dense) triples describing the same order.
        let groups: &[(&[f64], &[f64], &[f64])] = &[
            (&[1.5, 1.5, 3.0], &[1.0, 1.0, 3.0], &[1.0, 1.0, 2.0]),
            (
                &[1.5, 1.5, 3.5, 3.5, 5.0],
                &[1.0, 1.0, 3.0, 3.0, 5.0],
                &[1.0, 1.0, 2.0, 2.0, 3.0],
            ),
            (
                &[1.0, 2.0, 3.0, 4.0, 5.0],
                &[1.0, 2.0, 3.0, 4.0, 5.0],
                &[1.0, 2.0, 3.0, 4.0, 5.0],
            ),
            (
                &[1.0, 3.0, 3.0, 3.0, 5.0],
                &[1.0, 2.0, 2.0, 2.0, 5.0],
                &[1.0, 2.0, 2.0, 2.0, 3.0],
            ),
            (&[1.0, 3.0, 3.0, 3.0], &[1.0, 2.0, 2.0, 2.0], &[1.0, 2.0, 2.0, 2.0]),
        ];
        for (f, c, d) in groups {
            assert_eq!(to_fractional(f, RankNotation::Fractional).unwrap(), *f);
            assert_eq!(to_fractional(c, RankNotation::Competition).unwrap(), *f);
            assert_eq!(to_fractional(d, RankNotation::Dense).unwrap(), *f);
        }
    }

    #[test]
    fn conversion_rejects_bad_input() {
        let bad_fractional: &[&[f64]] = &[
            &[1.0, 2.0, 4.0],
            &[1.0, 1.0, 2.0],
            &[1.0, 1.0, 3.0],
            &[1.5],
            &[2.0],
            &[1.0, 0.0],
            &[1.0, -2.0],
        ];
        for ranks in bad_fractional {
            assert!(
                to_fractional(ranks, RankNotation::Fractional).is_err(),
                "accepted bad fractional ranks {:?}",
                ranks
            );
        }

        let bad_competition: &[&[f64]] = &[
            &[1.0, 2.0, 2.0, 3.0],
            &[1.0, 1.5, 1.5, 4.0],
            &[2.0],
            &[1.1],
        ];
        for ranks in bad_competition {
            assert!(
                to_fractional(ranks, RankNotation::Competition).is_err(),
                "accepted bad competition ranks {:?}",
                ranks
            );
        }

        let bad_dense: &[&[f64]] = &[&[1.0, 1.5, 1.5, 3.0], &[1.0, 1.0, 3.0], &[2.0]];
        for ranks in bad_dense {
            assert!(
                to_fractional(ranks, RankNotation::Dense).is_err(),
                "accepted bad dense ranks {:?}",
                ranks
            );
        }
    }

    #[test]
    fn empty_rank_list_is_fine() {
        assert_eq!(
            to_fractional(&[], RankNotation::Competition).unwrap(),
            Vec::<f64>::new()
        );
    }

    #[test]
    fn scores_exhaust_the_budget() {
        // 3 of 10 targets ranked explicitly; the remaining 7 share the rest.
        let prefs = Preferences::new(
            10,
            &[(2, 1.0), (5, 2.0), (7, 3.0)],
            RankNotation::Fractional,
        )
        .unwrap();
        assert_float_absolute_eq!(prefs.score(2), 1.0);
        assert_float_absolute_eq!(prefs.score(5), 2.0);
        assert_float_absolute_eq!(prefs.score(7), 3.0);
        // Budget 55, spent 6, 49 left over 7 unranked targets.
        assert_float_absolute_eq!(prefs.score(0), 7.0);
        let total: f64 = (0..10).map(|t| prefs.score(t)).sum();
        assert_float_absolute_eq!(total, 55.0);
    }

    #[test]
    fn budget_invariant_holds_for_all_notations() {
        for notation in [
            RankNotation::Fractional,
            RankNotation::Competition,
            RankNotation::Dense,
        ] {
            let raw = match notation {
                RankNotation::Fractional => [(0, 1.5), (1, 1.5), (2, 3.0)],
                RankNotation::Competition => [(0, 1.0), (1, 1.0), (2, 3.0)],
                RankNotation::Dense => [(0, 1.0), (1, 1.0), (2, 2.0)],
            };
            let prefs = Preferences::new(5, &raw, notation).unwrap();
            let total: f64 = (0..5).map(|t| prefs.score(t)).sum();
            assert_float_absolute_eq!(total, 15.0);
        }
    }

    #[test]
    fn competition_ties_become_fractional() {
        let prefs =
            Preferences::new(3, &[(0, 1.0), (1, 1.0), (2, 3.0)], RankNotation::Competition)
                .unwrap();
        assert_float_absolute_eq!(prefs.score(0), 1.5);
        assert_float_absolute_eq!(prefs.score(1), 1.5);
        assert_float_absolute_eq!(prefs.score(2), 3.0);
        let total: f64 = (0..3).map(|t| prefs.score(t)).sum();
        assert_float_absolute_eq!(total, 6.0);
    }

    #[test]
    fn fully_ranked_rater_has_no_unranked_share() {
        let prefs =
            Preferences::new(2, &[(0, 1.0), (1, 2.0)], RankNotation::Fractional).unwrap();
        assert!(prefs.is_explicit(0));
        assert!(prefs.is_explicit(1));
        assert_float_absolute_eq!(prefs.score(0) + prefs.score(1), 3.0);
    }

    #[test]
    fn duplicate_target_is_rejected() {
        // Two entries for target 0; ranks themselves are a valid tie.
        let result = Preferences::new(3, &[(0, 1.5), (0, 1.5)], RankNotation::Fractional);
        assert_eq!(result.unwrap_err(), RankError::DuplicateTarget);
    }

    #[test]
    fn rank_beyond_option_count_is_rejected() {
        let result = Preferences::new(2, &[(0, 1.0), (1, 2.0), (2, 3.0)], RankNotation::Fractional);
        assert!(matches!(result, Err(RankError::OutOfRange { .. })));
    }
}
