//! Shuffle for playlist randomization
//!
//! Only the part of the playlist after the current item is reordered, so
//! the current index and everything already played keep their positions.

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Re-randomize the items after `current` (the whole list if `None`)
pub fn reshuffle_tail<T>(items: &mut Vec<T>, current: Option<usize>) {
    reshuffle_tail_with(items, current, &mut thread_rng());
}

/// Re-randomize the tail with a caller-supplied RNG.
///
/// A tail of two or more items always comes out in a different order: if
/// the shuffle happens to produce the identity, the tail is rotated by one.
pub fn reshuffle_tail_with<T, R: Rng + ?Sized>(
    items: &mut Vec<T>,
    current: Option<usize>,
    rng: &mut R,
) {
    let start = current.map_or(0, |index| index + 1);
    if items.len() < start + 2 {
        return;
    }

    let mut tail: Vec<Option<T>> = items.drain(start..).map(Some).collect();
    let mut order: Vec<usize> = (0..tail.len()).collect();
    order.shuffle(rng);
    if order.iter().enumerate().all(|(i, &j)| i == j) {
        order.rotate_left(1);
    }

    items.extend(order.into_iter().filter_map(|j| tail[j].take()));
}
