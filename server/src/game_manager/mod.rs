use crate::config::ArenaConfig;
use dashmap::DashMap;
use shared::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod matchmaking;
pub mod move_handler;
pub mod queue;
pub mod rate_limit;
pub mod rooms;
pub mod session;
pub mod timer;

pub use error::GameError;
pub use queue::MatchmakingQueue;
pub use rate_limit::RateLimiter;
pub use rooms::{RoomRegistry, RoomStats};
pub use session::{Connection, Identity, Room, RoomStatus};
pub use timer::TimerRegistry;

pub struct AppState {
    pub config: ArenaConfig,
    pub connections: DashMap<String, Connection>,
    /// connection id -> room id, the room broadcast channel membership.
    pub connection_rooms: DashMap<String, String>,
    /// identity id -> room id, so one identity holds at most one seat.
    pub identity_rooms: DashMap<String, String>,
    pub queue: MatchmakingQueue,
    pub rooms: RoomRegistry,
    pub timers: TimerRegistry,
    pub rate_limiter: RateLimiter,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

/// Read-only snapshot served by `/stats`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArenaStats {
    pub connections: usize,
    pub queued: usize,
    pub queued_by_game_type: HashMap<String, usize>,
    pub rooms: RoomStats,
    pub rate_limited_identities: usize,
    pub rooms_with_timers: usize,
}

impl AppState {
    pub fn new(config: ArenaConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window);
        Self {
            config,
            connections: DashMap::new(),
            connection_rooms: DashMap::new(),
            identity_rooms: DashMap::new(),
            queue: MatchmakingQueue::new(),
            rooms: RoomRegistry::new(),
            timers: TimerRegistry::new(),
            rate_limiter,
            sweepers: Mutex::new(Vec::new()),
        }
    }

    pub fn identity_of(&self, connection_id: &str) -> Option<Identity> {
        self.connections
            .get(connection_id)
            .map(|c| c.identity.clone())
    }

    pub fn is_live(&self, connection_id: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|c| c.is_live())
    }

    pub fn send_to(&self, connection_id: &str, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(connection_id) {
            let _ = conn.tx.send(msg);
        }
    }

    /// Sends to the seated players whose connections are still joined to the room.
    pub fn emit_to_room(&self, room: &Room, msg: &ServerMessage) {
        for connection_id in room.connection_ids() {
            let joined = self
                .connection_rooms
                .get(connection_id)
                .is_some_and(|r| *r == room.id);
            if joined {
                self.send_to(connection_id, msg.clone());
            }
        }
    }

    pub fn emit_to_room_id(&self, room_id: &str, msg: &ServerMessage) {
        if let Some(room) = self.rooms.get_room(room_id) {
            self.emit_to_room(&room, msg);
        }
    }

    pub fn handle_message(self: &Arc<Self>, connection_id: &str, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinQueue { game_type } => self.join_queue(connection_id, &game_type),
            ClientMessage::LeaveQueue => self.leave_queue(connection_id),
            ClientMessage::Ready { room_id } => self.handle_ready(connection_id, &room_id),
            ClientMessage::Move {
                room_id,
                cell_index: value,
            }
            | ClientMessage::ChimpMove {
                room_id,
                cell_id: value,
            } => self.handle_move(connection_id, &room_id, value),
            ClientMessage::Leave => self.handle_leave(connection_id),
        }
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            connections: self.connections.len(),
            queued: self.queue.total_size(),
            queued_by_game_type: self.queue.stats_by_game_type(),
            rooms: self.rooms.stats(),
            rate_limited_identities: self.rate_limiter.len(),
            rooms_with_timers: self.timers.len(),
        }
    }
}
