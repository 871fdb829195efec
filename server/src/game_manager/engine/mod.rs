use crate::config::ArenaConfig;
use crate::game_manager::rooms::RoomRegistry;
use crate::game_manager::session::{Player, Puzzle, Room, RoomStatus};
use shared::{GameType, ServerMessage};
use std::time::Duration;

pub mod chimp;
pub mod sequence;

pub use chimp::ChimpMove;
pub use sequence::SequenceMove;

pub fn create_room(game_type: GameType, room_id: String, players: [Player; 2]) -> Room {
    match game_type {
        GameType::Sequence => sequence::create_room(room_id, players),
        GameType::Chimp => chimp::create_room(room_id, players),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Sequence(SequenceMove),
    Chimp(ChimpMove),
}

impl MoveOutcome {
    /// The mover after the click, or `None` if the click was not applied.
    pub const fn player(&self) -> Option<&Player> {
        match self {
            Self::Sequence(m) => m.player.as_ref(),
            Self::Chimp(m) => m.player.as_ref(),
        }
    }

    pub const fn correct(&self) -> bool {
        match self {
            Self::Sequence(m) => m.correct,
            Self::Chimp(m) => m.correct,
        }
    }

    /// The mover just finished the current level.
    pub const fn level_done(&self) -> bool {
        match self {
            Self::Sequence(m) => m.sequence_complete,
            Self::Chimp(m) => m.all_completed,
        }
    }

    /// Private result for the mover.
    pub fn result_message(&self) -> ServerMessage {
        match self {
            Self::Sequence(m) => ServerMessage::MoveResult {
                correct: m.correct,
                sequence_complete: m.sequence_complete,
            },
            Self::Chimp(m) => ServerMessage::ChimpMoveResult {
                correct: m.correct,
                completed_number: m.completed_number,
                all_completed: m.all_completed,
            },
        }
    }

    /// Progress notice for the opponent.
    pub fn progress_message(&self, player: &Player) -> ServerMessage {
        match self {
            Self::Sequence(_) => ServerMessage::OpponentProgress {
                player_id: player.id.clone(),
                current_index: player.current_index,
                current_level: player.current_level,
            },
            Self::Chimp(m) => ServerMessage::ChimpOpponentProgress {
                player_id: player.id.clone(),
                completed_count: m.completed_count,
                current_level: player.current_level,
            },
        }
    }

    pub fn player_complete_message(&self, level: u32) -> ServerMessage {
        match self {
            Self::Sequence(_) => ServerMessage::PlayerComplete {
                level,
                waiting_for_opponent: true,
            },
            Self::Chimp(_) => ServerMessage::ChimpPlayerComplete {
                level,
                waiting_for_opponent: true,
            },
        }
    }
}

pub fn process_move(rooms: &RoomRegistry, game_type: GameType, room_id: &str, player_id: &str, value: usize) -> MoveOutcome {
    match game_type {
        GameType::Sequence => MoveOutcome::Sequence(sequence::process_move(rooms, room_id, player_id, value)),
        GameType::Chimp => MoveOutcome::Chimp(chimp::process_move(rooms, room_id, player_id, value)),
    }
}

/// Advances the room only if it is still playing `level` and both players
/// have cleared it. Check and advance happen under one lock, so two players
/// finishing at the same moment advance the room once.
pub fn advance_if_cleared(rooms: &RoomRegistry, room_id: &str, level: u32) -> Option<Room> {
    rooms
        .with_room_mut(room_id, |room| {
            let cleared = room.status == RoomStatus::Playing
                && room.level == level
                && are_both_players_complete(room);
            if !cleared {
                return None;
            }
            let advanced = match room.game_type {
                GameType::Sequence => {
                    sequence::advance_to_next_level(room);
                    true
                }
                GameType::Chimp => chimp::advance_to_next_level(room),
            };
            advanced.then(|| room.clone())
        })
        .flatten()
}

pub fn are_both_players_complete(room: &Room) -> bool {
    match room.game_type {
        GameType::Sequence => sequence::are_both_players_complete(room),
        GameType::Chimp => chimp::are_both_players_complete(room),
    }
}

pub fn is_player_complete(room: &Room, player: &Player) -> bool {
    match room.game_type {
        GameType::Sequence => sequence::is_player_complete(room, player),
        GameType::Chimp => chimp::is_player_complete(room, player),
    }
}

/// How far the player got in the current level.
pub fn progress(room: &Room, player: &Player) -> u64 {
    match room.game_type {
        GameType::Sequence => player.current_index as u64,
        GameType::Chimp => u64::from(chimp::completed_count(room, player)),
    }
}

/// How long the client shows the puzzle before input (and the round timer) opens.
pub fn reveal_delay(room: &Room, config: &ArenaConfig) -> Duration {
    match &room.puzzle {
        Puzzle::Sequence(puzzle) => Duration::from_millis(
            puzzle.reveal_millis(config.sequence_step_ms, config.sequence_tail_ms),
        ),
        Puzzle::Chimp(_) => config.chimp_memorize,
    }
}

pub fn start_message(room: &Room, config: &ArenaConfig) -> ServerMessage {
    match &room.puzzle {
        Puzzle::Sequence(puzzle) => ServerMessage::Start {
            sequence: puzzle.sequence.clone(),
            grid_size: puzzle.grid_size,
            level: room.level,
            players: room.player_infos(),
        },
        Puzzle::Chimp(board) => ServerMessage::ChimpStart {
            cells: board.cells.clone(),
            numbers_count: board.numbers_count,
            level: room.level,
            players: room.player_infos(),
            memorize_ms: millis(config.chimp_memorize),
        },
    }
}

pub fn level_complete_message(room: &Room, config: &ArenaConfig) -> ServerMessage {
    match &room.puzzle {
        Puzzle::Sequence(puzzle) => ServerMessage::LevelComplete {
            new_level: room.level,
            sequence: puzzle.sequence.clone(),
            grid_size: puzzle.grid_size,
        },
        Puzzle::Chimp(board) => ServerMessage::ChimpLevelComplete {
            new_level: room.level,
            cells: board.cells.clone(),
            numbers_count: board.numbers_count,
            memorize_ms: millis(config.chimp_memorize),
        },
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
