use memory_core::chimp::{generate_cells, CELL_COUNT, MAX_NUMBERS};
use memory_core::sequence::grid_size_for_level;
use memory_core::{ChimpBoard, ChimpVerdict, SequencePuzzle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

#[test]
fn sequence_length_matches_level_and_stays_on_grid() {
    let mut rng = StdRng::seed_from_u64(0x00C0_FFEE);
    for level in 1..=30 {
        for _ in 0..20 {
            let puzzle = SequencePuzzle::generate(level, &mut rng);
            assert_eq!(puzzle.len(), level as usize);
            let cells = puzzle.grid_size * puzzle.grid_size;
            assert!(puzzle.sequence.iter().all(|&cell| cell < cells));
        }
    }
}

#[test]
fn grid_size_never_shrinks() {
    let sizes: Vec<usize> = (1..=50).map(grid_size_for_level).collect();
    assert!(sizes.windows(2).all(|w| matches!(w, [a, b] if a <= b)));
}

#[test]
fn chimp_cells_carry_exactly_one_of_each_number() {
    let mut rng = StdRng::seed_from_u64(1234);
    for n in 1..=MAX_NUMBERS {
        let cells = generate_cells(n, &mut rng);
        assert_eq!(cells.len(), CELL_COUNT);

        let numbers: Vec<u32> = cells.iter().filter_map(|c| c.number).collect();
        assert_eq!(numbers.len(), n as usize);

        let distinct: HashSet<u32> = numbers.iter().copied().collect();
        assert_eq!(distinct, (1..=n).collect::<HashSet<u32>>());

        let ids: HashSet<usize> = cells.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), CELL_COUNT);
    }
}

#[test]
fn chimp_layout_is_not_reading_order() {
    // With 10 numbers, a sorted layout from 20 independent deals is vanishingly unlikely.
    let mut rng = StdRng::seed_from_u64(99);
    let sorted_deals = (0..20)
        .filter(|_| {
            let numbers: Vec<u32> = generate_cells(10, &mut rng)
                .iter()
                .filter_map(|c| c.number)
                .collect();
            numbers.windows(2).all(|w| matches!(w, [a, b] if a < b))
        })
        .count();
    assert!(sorted_deals < 20);
}

#[test]
fn chimp_progress_moves_one_step_per_correct_click() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut board = ChimpBoard::new(6, ["p1", "p2"], &mut rng);

    for expected in 1..=6u32 {
        let target = board
            .cells
            .iter()
            .find(|c| c.number == Some(expected))
            .map(|c| c.id)
            .unwrap_or(usize::MAX);
        let before = board.progress_of("p1").map(|p| p.completed_count);

        match board.submit("p1", target) {
            ChimpVerdict::Correct { progress, .. } => {
                assert_eq!(Some(progress.completed_count - 1), before);
            }
            other => panic!("expected correct click, got {other:?}"),
        }
    }
    assert!(board.is_complete("p1"));
}

#[test]
fn board_serializes_for_the_wire() {
    let mut rng = StdRng::seed_from_u64(3);
    let board = ChimpBoard::new(4, ["p1", "p2"], &mut rng);
    let json = serde_json::to_value(&board.cells).unwrap_or_default();
    assert_eq!(json.as_array().map(Vec::len), Some(CELL_COUNT));
}
