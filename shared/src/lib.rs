use memory_core::Cell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Sequence,
    Chimp,
}

impl GameType {
    /// Unrecognized ids fall back to the sequence game.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "chimp" => Self::Chimp,
            _ => Self::Sequence,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Chimp => "chimp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinQueue { game_type: String },
    LeaveQueue,
    Ready { room_id: String },
    Move { room_id: String, cell_index: usize },
    ChimpMove { room_id: String, cell_id: usize },
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentInfo {
    pub id: String,
    pub name: String,
    pub rank: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    ConfirmationTimeout,
    OpponentLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    WrongMove,
    Timeout,
    OpponentForfeited,
    OpponentDisconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    QueueStatus {
        position: usize,
        estimated_wait_secs: u64,
        error: Option<String>,
    },
    MatchFound {
        opponent: OpponentInfo,
        room_id: String,
        game_type: GameType,
    },
    MatchCancelled {
        reason: CancelReason,
    },
    Countdown {
        seconds: u64,
    },
    Start {
        sequence: Vec<usize>,
        grid_size: usize,
        level: u32,
        players: Vec<PlayerInfo>,
    },
    ChimpStart {
        cells: Vec<Cell>,
        numbers_count: u32,
        level: u32,
        players: Vec<PlayerInfo>,
        memorize_ms: u64,
    },
    MoveResult {
        correct: bool,
        sequence_complete: bool,
    },
    ChimpMoveResult {
        correct: bool,
        completed_number: Option<u32>,
        all_completed: bool,
    },
    OpponentProgress {
        player_id: String,
        current_index: usize,
        current_level: u32,
    },
    ChimpOpponentProgress {
        player_id: String,
        completed_count: u32,
        current_level: u32,
    },
    RoundTimer {
        time_left: u64,
        total_time: u64,
    },
    LevelComplete {
        new_level: u32,
        sequence: Vec<usize>,
        grid_size: usize,
    },
    ChimpLevelComplete {
        new_level: u32,
        cells: Vec<Cell>,
        numbers_count: u32,
        memorize_ms: u64,
    },
    PlayerComplete {
        level: u32,
        waiting_for_opponent: bool,
    },
    ChimpPlayerComplete {
        level: u32,
        waiting_for_opponent: bool,
    },
    Timeout {
        loser_id: Option<String>,
    },
    End {
        winner_id: Option<String>,
        loser_id: Option<String>,
        winner_name: Option<String>,
        loser_name: Option<String>,
        reason: EndReason,
        final_level: u32,
    },
    Error {
        message: String,
        kind: Option<String>,
    },
}
