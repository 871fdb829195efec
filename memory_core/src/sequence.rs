use rand::Rng;
use serde::{Deserialize, Serialize};

/// Grid edge length for a level. Never shrinks as the level grows.
#[must_use]
pub const fn grid_size_for_level(level: u32) -> usize {
    match level {
        0..=3 => 3,
        4..=6 => 4,
        7..=9 => 5,
        _ => 6,
    }
}

/// The cells a player has to click back, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePuzzle {
    pub sequence: Vec<usize>,
    pub grid_size: usize,
}

impl SequencePuzzle {
    /// One cell per level, drawn independently (repeats allowed).
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(level: u32, rng: &mut R) -> Self {
        let grid_size = grid_size_for_level(level);
        let cell_count = grid_size * grid_size;
        let sequence = (0..level).map(|_| rng.gen_range(0..cell_count)).collect();
        Self {
            sequence,
            grid_size,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Cell expected at `index`, `None` once the sequence is exhausted.
    #[must_use]
    pub fn expected_at(&self, index: usize) -> Option<usize> {
        self.sequence.get(index).copied()
    }

    #[must_use]
    pub fn is_complete(&self, index: usize) -> bool {
        index >= self.sequence.len()
    }

    /// Time the client needs to play the sequence back before input opens.
    #[must_use]
    pub fn reveal_millis(&self, step_ms: u64, tail_ms: u64) -> u64 {
        self.sequence.len() as u64 * step_ms + tail_ms
    }
}
