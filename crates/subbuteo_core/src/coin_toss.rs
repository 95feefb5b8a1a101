//! Coin toss state and the deterministic source of toss results.

use serde::{Deserialize, Serialize};

use crate::phase::Team;

/// Visible state of the coin toss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CoinToss {
    /// Winner, once the toss has landed.
    pub result: Option<Team>,
    /// True between starting the toss and its result.
    pub animating: bool,
}

impl CoinToss {
    /// Whether a new toss may start.
    #[must_use]
    pub const fn can_start(&self) -> bool {
        !self.animating && self.result.is_none()
    }
}

/// Where toss results come from.
///
/// The core never touches system randomness: a seeded generator gives a
/// reproducible 50/50 sequence, and `Fixed` pins the outcome for scripted
/// matches and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TossSource {
    /// Linear congruential sequence from a seed.
    Seeded {
        /// Generator state.
        state: u64,
    },
    /// Always the same winner.
    Fixed(Team),
}

impl Default for TossSource {
    fn default() -> Self {
        Self::seeded(0x5EED)
    }
}

impl TossSource {
    /// Seeded source.
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self::Seeded {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Draw the next winner.
    pub fn next_winner(&mut self) -> Team {
        match self {
            Self::Seeded { state } => {
                *state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                // High bits of an LCG are the well-distributed ones.
                if (*state >> 63) == 0 {
                    Team::Home
                } else {
                    Team::Away
                }
            }
            Self::Fixed(team) => *team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source() {
        let mut source = TossSource::Fixed(Team::Away);
        for _ in 0..5 {
            assert_eq!(source.next_winner(), Team::Away);
        }
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = TossSource::seeded(42);
        let mut b = TossSource::seeded(42);
        let seq_a: Vec<_> = (0..32).map(|_| a.next_winner()).collect();
        let seq_b: Vec<_> = (0..32).map(|_| b.next_winner()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_seeded_source_is_roughly_fair() {
        let mut source = TossSource::seeded(7);
        let home = (0..10_000)
            .filter(|_| source.next_winner() == Team::Home)
            .count();
        assert!((4_500..5_500).contains(&home), "home won {home} of 10000");
    }

    #[test]
    fn test_can_start() {
        assert!(CoinToss::default().can_start());
        let animating = CoinToss {
            result: None,
            animating: true,
        };
        assert!(!animating.can_start());
        let landed = CoinToss {
            result: Some(Team::Home),
            animating: false,
        };
        assert!(!landed.can_start());
    }
}
