use crate::game_manager::rooms::{apply_player_update, reset_players, PlayerUpdate, RoomRegistry};
use crate::game_manager::session::{Player, Puzzle, Room, RoomStatus};
use memory_core::SequencePuzzle;
use shared::GameType;

/// Result of one click in a sequence room. `player` is `None` when the click
/// was not applied (room or player gone, room not playing, or the player
/// already finished or failed this level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMove {
    pub correct: bool,
    pub sequence_complete: bool,
    pub player: Option<Player>,
}

impl SequenceMove {
    const fn ignored() -> Self {
        Self {
            correct: false,
            sequence_complete: false,
            player: None,
        }
    }
}

pub fn generate_sequence(level: u32) -> SequencePuzzle {
    SequencePuzzle::generate(level, &mut rand::thread_rng())
}

pub fn create_room(room_id: String, players: [Player; 2]) -> Room {
    let puzzle = generate_sequence(1);
    Room::new(room_id, GameType::Sequence, players, Puzzle::Sequence(puzzle))
}

pub fn process_move(rooms: &RoomRegistry, room_id: &str, player_id: &str, cell_index: usize) -> SequenceMove {
    rooms
        .with_room_mut(room_id, |room| {
            if room.status != RoomStatus::Playing {
                return SequenceMove::ignored();
            }
            let Puzzle::Sequence(puzzle) = &room.puzzle else {
                return SequenceMove::ignored();
            };
            let puzzle_len = puzzle.len();
            let Some(player) = room.players.iter().find(|p| p.id == player_id) else {
                return SequenceMove::ignored();
            };
            if player.has_failed {
                return SequenceMove::ignored();
            }
            let Some(expected) = puzzle.expected_at(player.current_index) else {
                return SequenceMove::ignored();
            };

            let update = if cell_index == expected {
                PlayerUpdate {
                    current_index: Some(player.current_index + 1),
                    ..PlayerUpdate::default()
                }
            } else {
                PlayerUpdate {
                    has_failed: Some(true),
                    ..PlayerUpdate::default()
                }
            };

            let Some(player) = room.player_mut(player_id) else {
                return SequenceMove::ignored();
            };
            apply_player_update(player, update);

            let correct = cell_index == expected;
            SequenceMove {
                correct,
                sequence_complete: correct && player.current_index == puzzle_len,
                player: Some(player.clone()),
            }
        })
        .unwrap_or_else(SequenceMove::ignored)
}

pub fn is_player_complete(room: &Room, player: &Player) -> bool {
    match &room.puzzle {
        Puzzle::Sequence(puzzle) => puzzle.is_complete(player.current_index),
        Puzzle::Chimp(_) => false,
    }
}

pub fn are_both_players_complete(room: &Room) -> bool {
    room.players.iter().all(|p| is_player_complete(room, p))
}

/// Bumps the level, deals a longer sequence and rewinds both players.
pub fn advance_to_next_level(room: &mut Room) {
    room.level += 1;
    room.puzzle = Puzzle::Sequence(generate_sequence(room.level));
    room.generation += 1;
    reset_players(room);
}
