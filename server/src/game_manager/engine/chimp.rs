use crate::game_manager::rooms::{reset_players, RoomRegistry};
use crate::game_manager::session::{Player, Puzzle, Room, RoomStatus};
use memory_core::chimp::STARTING_NUMBERS;
use memory_core::{ChimpBoard, ChimpProgress, ChimpVerdict};
use shared::GameType;

/// Result of one click in a chimp room. `player` is `None` when nothing was
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChimpMove {
    pub correct: bool,
    pub completed_number: Option<u32>,
    pub all_completed: bool,
    pub completed_count: u32,
    pub player: Option<Player>,
}

impl ChimpMove {
    const fn ignored() -> Self {
        Self {
            correct: false,
            completed_number: None,
            all_completed: false,
            completed_count: 0,
            player: None,
        }
    }
}

pub fn create_room(room_id: String, players: [Player; 2]) -> Room {
    let board = ChimpBoard::new(
        STARTING_NUMBERS,
        players.iter().map(|p| p.id.as_str()),
        &mut rand::thread_rng(),
    );
    Room::new(room_id, GameType::Chimp, players, Puzzle::Chimp(board))
}

pub fn process_move(rooms: &RoomRegistry, room_id: &str, player_id: &str, cell_id: usize) -> ChimpMove {
    rooms
        .with_room_mut(room_id, |room| {
            if room.status != RoomStatus::Playing {
                return ChimpMove::ignored();
            }
            if room.player(player_id).is_none_or(|p| p.has_failed) {
                return ChimpMove::ignored();
            }
            let Puzzle::Chimp(board) = &mut room.puzzle else {
                return ChimpMove::ignored();
            };
            if board.is_complete(player_id) {
                return ChimpMove::ignored();
            }

            let verdict = board.submit(player_id, cell_id);
            let completed_count = board.progress_of(player_id).map_or(0, |p| p.completed_count);
            let Some(player) = room.player_mut(player_id) else {
                return ChimpMove::ignored();
            };

            match verdict {
                ChimpVerdict::Correct {
                    completed_number,
                    all_completed,
                    progress,
                } => {
                    player.current_index = progress.completed_count as usize;
                    ChimpMove {
                        correct: true,
                        completed_number: Some(completed_number),
                        all_completed,
                        completed_count: progress.completed_count,
                        player: Some(player.clone()),
                    }
                }
                ChimpVerdict::Wrong => {
                    player.has_failed = true;
                    ChimpMove {
                        correct: false,
                        completed_number: None,
                        all_completed: false,
                        completed_count,
                        player: Some(player.clone()),
                    }
                }
                ChimpVerdict::UnknownPlayer => ChimpMove::ignored(),
            }
        })
        .unwrap_or_else(ChimpMove::ignored)
}

pub fn get_player_progress(rooms: &RoomRegistry, room_id: &str, player_id: &str) -> Option<ChimpProgress> {
    let room = rooms.get_room(room_id)?;
    match &room.puzzle {
        Puzzle::Chimp(board) => board.progress_of(player_id),
        Puzzle::Sequence(_) => None,
    }
}

pub fn is_player_complete(room: &Room, player: &Player) -> bool {
    match &room.puzzle {
        Puzzle::Chimp(board) => board.is_complete(&player.id),
        Puzzle::Sequence(_) => false,
    }
}

pub fn completed_count(room: &Room, player: &Player) -> u32 {
    match &room.puzzle {
        Puzzle::Chimp(board) => board
            .progress_of(&player.id)
            .map_or(0, |p| p.completed_count),
        Puzzle::Sequence(_) => 0,
    }
}

pub fn are_both_players_complete(room: &Room) -> bool {
    room.players.iter().all(|p| is_player_complete(room, p))
}

/// Bumps the level, adds one number per level step and deals a fresh grid.
/// Returns `false` if the room does not hold a chimp board.
pub fn advance_to_next_level(room: &mut Room) -> bool {
    let old_level = room.level;
    let new_level = old_level + 1;
    let Puzzle::Chimp(board) = &mut room.puzzle else {
        return false;
    };
    let numbers_count = board.numbers_count + (new_level - old_level);
    board.redeal(numbers_count, &mut rand::thread_rng());
    room.level = new_level;
    room.generation += 1;
    reset_players(room);
    true
}
