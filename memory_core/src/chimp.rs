use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const GRID_COLUMNS: usize = 8;
pub const GRID_ROWS: usize = 5;
pub const CELL_COUNT: usize = GRID_COLUMNS * GRID_ROWS;
pub const STARTING_NUMBERS: u32 = 4;
#[allow(clippy::cast_possible_truncation)]
pub const MAX_NUMBERS: u32 = CELL_COUNT as u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: usize,
    pub number: Option<u32>,
    pub revealed: bool,
    pub completed: bool,
}

/// Lays `count` numbers (1..=count) onto random cells of the 8x5 grid.
///
/// Cell positions are sampled without replacement and the numbers are
/// shuffled across them, so reading order says nothing about the order to
/// click in. `count` is clamped to the grid size.
#[must_use]
pub fn generate_cells<R: Rng + ?Sized>(count: u32, rng: &mut R) -> Vec<Cell> {
    let count = count.min(MAX_NUMBERS);
    let mut cells: Vec<Cell> = (0..CELL_COUNT)
        .map(|id| Cell {
            id,
            number: None,
            revealed: true,
            completed: false,
        })
        .collect();

    let mut numbers: Vec<u32> = (1..=count).collect();
    numbers.shuffle(rng);

    for (cell_id, number) in index::sample(rng, CELL_COUNT, numbers.len())
        .into_iter()
        .zip(numbers)
    {
        if let Some(cell) = cells.get_mut(cell_id) {
            cell.number = Some(number);
        }
    }

    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChimpProgress {
    pub completed_count: u32,
    pub next_expected_number: u32,
}

impl Default for ChimpProgress {
    fn default() -> Self {
        Self {
            completed_count: 0,
            next_expected_number: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChimpVerdict {
    /// The clicked cell held the next number for this player.
    Correct {
        completed_number: u32,
        all_completed: bool,
        progress: ChimpProgress,
    },
    Wrong,
    /// No cursor is tracked for this player.
    UnknownPlayer,
}

/// One chimp level: the shared grid plus each player's click cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChimpBoard {
    pub cells: Vec<Cell>,
    pub numbers_count: u32,
    pub progress: HashMap<String, ChimpProgress>,
}

impl ChimpBoard {
    #[must_use]
    pub fn new<'a, R, I>(numbers_count: u32, players: I, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = &'a str>,
    {
        let numbers_count = numbers_count.min(MAX_NUMBERS);
        Self {
            cells: generate_cells(numbers_count, rng),
            numbers_count,
            progress: players
                .into_iter()
                .map(|id| (id.to_string(), ChimpProgress::default()))
                .collect(),
        }
    }

    #[must_use]
    pub fn number_at(&self, cell_id: usize) -> Option<u32> {
        self.cells.get(cell_id).and_then(|cell| cell.number)
    }

    #[must_use]
    pub fn progress_of(&self, player_id: &str) -> Option<ChimpProgress> {
        self.progress.get(player_id).copied()
    }

    #[must_use]
    pub fn is_complete(&self, player_id: &str) -> bool {
        self.progress
            .get(player_id)
            .is_some_and(|p| p.completed_count >= self.numbers_count)
    }

    /// Checks a click against the player's cursor. Only a correct click mutates.
    pub fn submit(&mut self, player_id: &str, cell_id: usize) -> ChimpVerdict {
        let numbers_count = self.numbers_count;
        let clicked = self.number_at(cell_id);
        let Some(progress) = self.progress.get_mut(player_id) else {
            return ChimpVerdict::UnknownPlayer;
        };

        if clicked != Some(progress.next_expected_number) {
            return ChimpVerdict::Wrong;
        }

        let completed_number = progress.next_expected_number;
        progress.completed_count += 1;
        progress.next_expected_number += 1;
        let progress = *progress;

        if let Some(cell) = self.cells.get_mut(cell_id) {
            cell.completed = true;
        }

        ChimpVerdict::Correct {
            completed_number,
            all_completed: progress.completed_count == numbers_count,
            progress,
        }
    }

    /// Deals a fresh grid with `numbers_count` numbers and rewinds every cursor.
    pub fn redeal<R: Rng + ?Sized>(&mut self, numbers_count: u32, rng: &mut R) {
        self.numbers_count = numbers_count.min(MAX_NUMBERS);
        self.cells = generate_cells(self.numbers_count, rng);
        for progress in self.progress.values_mut() {
            *progress = ChimpProgress::default();
        }
    }
}
