//! Scoring rules. Everything here is pure apart from the penalty coin flip,
//! which takes the room's RNG.

use rand::Rng;

/// Fraction of `max_points` the drawer earns when anyone guessed.
pub const DRAWER_REWARD: (u32, u32) = (3, 4);

/// Fraction of `max_points` the drawer may lose when nobody guessed.
pub const DRAWER_PENALTY: (u32, u32) = (1, 4);

/// Chance that a drawer nobody guessed is penalized.
pub const DRAWER_PENALTY_PROBABILITY: f64 = 0.5;

fn fraction(value: u32, (num, den): (u32, u32)) -> u32 {
    (u64::from(value) * u64::from(num) / u64::from(den)) as u32
}

fn next_term(prev: u32, position: usize) -> u32 {
    match position {
        1 => prev / 2 + 60,
        2 => prev / 2 + 30,
        3 => fraction(prev, (3, 4)),
        _ => prev / 2,
    }
}

/// Points for correct guessers, in guess order.
///
/// ```text
/// 300 → [300, 210, 135, 101, 50, 25, 12, 6, 3, 1]
/// ```
///
/// The first term is `max_points`, followed by two halve-plus-offset terms,
/// one three-quarter term, then plain halving until zero. Each term is
/// capped one below its predecessor so the sequence strictly decreases
/// even for small `max_points`. Zero terms are not included.
pub fn score_sequence(max_points: u32) -> Vec<u32> {
    let mut seq = vec![max_points];
    while let Some(&prev) = seq.last() {
        let next = next_term(prev, seq.len()).min(prev.saturating_sub(1));
        if next == 0 {
            break;
        }
        seq.push(next);
    }
    seq
}

/// Points for the `index`-th correct guesser (0-based). Late guessers get 0.
pub fn guesser_points(sequence: &[u32], index: usize) -> u32 {
    sequence.get(index).copied().unwrap_or(0)
}

/// What happens to the drawer when a turn ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerOutcome {
    Reward(u32),
    Penalty(u32),
    Spared,
}

/// Applies the drawer rule: a fixed reward if anyone guessed, otherwise a
/// coin flip between a fixed penalty and nothing.
pub fn drawer_outcome<R: Rng>(max_points: u32, anyone_guessed: bool, rng: &mut R) -> DrawerOutcome {
    if anyone_guessed {
        DrawerOutcome::Reward(fraction(max_points, DRAWER_REWARD))
    } else if rng.random_bool(DRAWER_PENALTY_PROBABILITY) {
        DrawerOutcome::Penalty(fraction(max_points, DRAWER_PENALTY))
    } else {
        DrawerOutcome::Spared
    }
}

/// Subtracts `penalty` from `score`. A score left below zero adds its full
/// magnitude to `debt`, even when it was already negative.
pub fn apply_penalty(score: &mut i64, debt: &mut u64, penalty: u32) {
    let penalty = i64::from(penalty);
    let after = *score - penalty;
    if after < 0 {
        *debt += after.unsigned_abs();
    }
    *score = after;
}
