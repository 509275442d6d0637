//! The word mask: what guessers see of the secret word.
//!
//! ```text
//! word   "ice cream"
//! start  [_ _ _   _ _ _ _ _]
//! reveal [_ C _   _ _ E _ _]   (at most `max_letters_revealed` letters)
//! ```
//!
//! Word breaks (whitespace and hyphens) are visible from the start and are
//! never picked for a reveal.

use std::time::Duration;

use rand::Rng;

use crate::EngineConfig;

/// Words with at most this many significant characters reveal slowly.
pub const SHORT_WORD_LEN: usize = 3;

/// What a hidden slot renders as.
pub const HIDDEN: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Break(char),
    Hidden(char),
    Shown(char),
}

/// Per-turn mask state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    slots: Vec<Slot>,
    revealed: usize,
}

fn is_break(c: char) -> bool {
    c.is_whitespace() || c == '-'
}

impl Mask {
    /// One slot per character; breaks visible, everything else hidden.
    pub fn new(word: &str) -> Self {
        let slots = word
            .chars()
            .map(|c| if is_break(c) { Slot::Break(c) } else { Slot::Hidden(c) })
            .collect();
        Self { slots, revealed: 0 }
    }

    /// What guessers see. Revealed letters are uppercased.
    pub fn render(&self) -> Vec<char> {
        self.slots
            .iter()
            .map(|slot| match *slot {
                Slot::Break(c) => c,
                Slot::Hidden(_) => HIDDEN,
                Slot::Shown(c) => c.to_uppercase().next().unwrap_or(c),
            })
            .collect()
    }

    /// Number of characters that are not word breaks.
    pub fn significant_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot, Slot::Break(_)))
            .count()
    }

    /// Number of slots still hidden.
    pub fn hidden_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Hidden(_)))
            .count()
    }

    /// Letters revealed so far this turn.
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// Whether another reveal is allowed under `cap`.
    pub fn can_reveal(&self, cap: usize) -> bool {
        self.revealed < cap && self.hidden_count() > 0
    }

    /// Reveals the slot at `index`. Returns `false` for breaks, shown slots
    /// and out-of-range indices.
    pub fn reveal_at(&mut self, index: usize) -> bool {
        match self.slots.get(index).copied() {
            Some(Slot::Hidden(c)) => {
                self.slots[index] = Slot::Shown(c);
                self.revealed += 1;
                true
            }
            _ => false,
        }
    }

    /// Reveals one uniformly random hidden slot and returns its index.
    pub fn reveal_random<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        let hidden: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Hidden(_)))
            .map(|(i, _)| i)
            .collect();
        if hidden.is_empty() {
            return None;
        }
        let index = hidden[rng.random_range(0..hidden.len())];
        self.reveal_at(index);
        Some(index)
    }

    /// The delay before the next reveal. Short words wait longer.
    pub fn reveal_delay(&self, config: &EngineConfig) -> Duration {
        if self.significant_len() <= SHORT_WORD_LEN {
            config.short_word_reveal_interval
        } else {
            config.reveal_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_new_hides_letters_keeps_breaks() {
        let mask = Mask::new("ice cream");
        assert_eq!(mask.render(), "___ _____".chars().collect::<Vec<_>>());
        assert_eq!(mask.significant_len(), 8);
        assert_eq!(mask.hidden_count(), 8);
    }

    #[test]
    fn test_new_hyphen_visible_and_not_counted() {
        let mask = Mask::new("t-shirt");
        assert_eq!(mask.render(), "_-_____".chars().collect::<Vec<_>>());
        assert_eq!(mask.significant_len(), 6);
    }

    #[test]
    fn test_reveal_at_uppercases_and_counts() {
        let mut mask = Mask::new("kiwi");
        assert!(mask.reveal_at(0));
        assert_eq!(mask.render(), vec!['K', '_', '_', '_']);
        assert_eq!(mask.revealed(), 1);
        assert!(!mask.reveal_at(0));
    }

    #[test]
    fn test_reveal_at_break_is_refused() {
        let mut mask = Mask::new("t-rex");
        assert!(!mask.reveal_at(1));
        assert_eq!(mask.revealed(), 0);
    }

    #[test]
    fn test_reveal_random_exhausts_hidden_slots() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mask = Mask::new("a b");
        assert!(mask.reveal_random(&mut rng).is_some());
        assert!(mask.reveal_random(&mut rng).is_some());
        assert_eq!(mask.reveal_random(&mut rng), None);
        assert_eq!(mask.render(), vec!['A', ' ', 'B']);
    }

    #[test]
    fn test_can_reveal_respects_cap() {
        let mut mask = Mask::new("banana");
        mask.reveal_at(0);
        assert!(!mask.can_reveal(1));
        assert!(mask.can_reveal(2));
        assert!(!mask.can_reveal(0));
    }

    #[test]
    fn test_reveal_delay_longer_for_short_words() {
        let config = EngineConfig::default();
        assert_eq!(Mask::new("cat").reveal_delay(&config), config.short_word_reveal_interval);
        assert_eq!(Mask::new("a b c").reveal_delay(&config), config.short_word_reveal_interval);
        assert_eq!(Mask::new("camel").reveal_delay(&config), config.reveal_interval);
    }
}
