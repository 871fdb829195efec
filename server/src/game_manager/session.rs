use memory_core::{ChimpBoard, SequencePuzzle};
use shared::{GameType, OpponentInfo, PlayerInfo, ServerMessage};
use tokio::sync::mpsc;

use std::time::Instant;

pub type Tx = mpsc::UnboundedSender<ServerMessage>;

/// Authenticated user attached to a connection by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

pub struct Connection {
    pub identity: Identity,
    pub tx: Tx,
}

impl Connection {
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub connection_id: String,
    pub is_ready: bool,
    pub current_level: u32,
    pub current_index: usize,
    pub has_failed: bool,
}

impl Player {
    pub fn new(identity: Identity, connection_id: String) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            connection_id,
            is_ready: false,
            current_level: 1,
            current_index: 0,
            has_failed: false,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn opponent_info(&self) -> OpponentInfo {
        OpponentInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            rank: "unranked".to_string(),
        }
    }
}

/// Puzzle state lives inside the room so removing the room drops it too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Puzzle {
    Sequence(SequencePuzzle),
    Chimp(ChimpBoard),
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub game_type: GameType,
    pub players: [Player; 2],
    pub status: RoomStatus,
    pub level: u32,
    pub puzzle: Puzzle,
    pub created_at: Instant,
    pub winner_id: Option<String>,
    /// Bumped on every phase change; timers scheduled for an older
    /// generation must not act.
    pub generation: u64,
}

impl Room {
    pub fn new(id: String, game_type: GameType, players: [Player; 2], puzzle: Puzzle) -> Self {
        Self {
            id,
            game_type,
            players,
            status: RoomStatus::Waiting,
            level: 1,
            puzzle,
            created_at: Instant::now(),
            winner_id: None,
            generation: 0,
        }
    }

    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.seat_of(player_id).is_some()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn opponent(&self, player_id: &str) -> Option<&Player> {
        if !self.has_player(player_id) {
            return None;
        }
        self.players.iter().find(|p| p.id != player_id)
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().all(|p| p.is_ready)
    }

    pub fn player_infos(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::info).collect()
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|p| p.connection_id.as_str())
    }
}
