//! Deterministic, input-order-independent shuffling.
//!
//! Students are first sorted by their canonical key (the id) and then
//! permuted with a generator seeded from the configured seed. The sort
//! removes any bias from the order rows happened to arrive in; the shuffle
//! removes the alphabetical bias the sort would otherwise introduce. The
//! resulting order is the sole tie-break source of the whole pipeline:
//! repeated runs on the same data pick the same one among equally good
//! solutions, regardless of input row order.
//!
//! Projects and supervisors are sorted but not shuffled. Project order never
//! decides between students, so randomizing it would buy nothing; keeping it
//! stable makes reports easier to compare between runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Produce the deterministic processing order for a set of keyed items.
///
/// Returns a permutation of `0..keys.len()`: position k of the result holds
/// the original index of the item to process k-th. The generator is
/// constructed here from the explicit seed; it is never shared or ambient.
pub fn deterministic_order<K: Ord>(keys: &[K], seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}
