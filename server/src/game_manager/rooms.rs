use crate::game_manager::session::{Player, Puzzle, Room, RoomStatus};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Partial update for a seated player. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerUpdate {
    pub is_ready: Option<bool>,
    pub current_level: Option<u32>,
    pub current_index: Option<usize>,
    pub has_failed: Option<bool>,
}

/// Partial update for a room's level and puzzle.
#[derive(Debug, Clone, Default)]
pub struct RoomGameData {
    pub level: Option<u32>,
    pub puzzle: Option<Puzzle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RoomStats {
    pub waiting: usize,
    pub playing: usize,
    pub finished: usize,
    pub total: usize,
}

/// Rooms the sweep decided to drop.
#[derive(Debug, Default)]
pub struct SweptRooms {
    /// Matched but never confirmed by both players.
    pub unconfirmed: Vec<Room>,
    /// Finished long enough ago that nobody is looking at the result.
    pub expired: Vec<Room>,
}

/// Authoritative store of live matches.
///
/// Every mutation runs inside a single `get_mut` so the shard lock acts as
/// the per-room mutex. Lookups hand out clones.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&self, room: Room) {
        tracing::info!(room_id = %room.id, game_type = room.game_type.as_str(), "Room created");
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|r| r.value().clone())
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn remove_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id).map(|(_, room)| room)
    }

    /// Runs `f` against the room under its lock.
    pub fn with_room_mut<T>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> T) -> Option<T> {
        self.rooms.get_mut(room_id).map(|mut room| f(room.value_mut()))
    }

    /// Marks the player ready. Returns whether both players are now ready.
    pub fn set_player_ready(&self, room_id: &str, player_id: &str) -> bool {
        self.with_room_mut(room_id, |room| {
            let Some(player) = room.player_mut(player_id) else {
                return false;
            };
            player.is_ready = true;
            room.all_ready()
        }) == Some(true)
    }

    /// `waiting -> playing`. Any other starting status is left alone.
    pub fn start_game(&self, room_id: &str) -> Option<Room> {
        self.with_room_mut(room_id, |room| {
            if room.status != RoomStatus::Waiting {
                return None;
            }
            room.status = RoomStatus::Playing;
            room.generation += 1;
            Some(room.clone())
        })
        .flatten()
    }

    /// Moves the room to `finished`. Returns `None` if it already was, so a
    /// match can only be resolved once.
    pub fn end_game(&self, room_id: &str, winner_id: Option<&str>) -> Option<Room> {
        self.with_room_mut(room_id, |room| mark_finished(room, winner_id).then(|| room.clone()))
            .flatten()
    }

    pub fn status(&self, room_id: &str) -> Option<RoomStatus> {
        self.rooms.get(room_id).map(|room| room.status)
    }

    pub fn get_opponent(&self, room_id: &str, player_id: &str) -> Option<Player> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.opponent(player_id).cloned())
    }

    pub fn get_player(&self, room_id: &str, player_id: &str) -> Option<Player> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.player(player_id).cloned())
    }

    pub fn update_player(&self, room_id: &str, player_id: &str, update: PlayerUpdate) -> Option<Player> {
        self.with_room_mut(room_id, |room| {
            let player = room.player_mut(player_id)?;
            apply_player_update(player, update);
            Some(player.clone())
        })
        .flatten()
    }

    pub fn update_room_game_data(&self, room_id: &str, data: RoomGameData) -> Option<Room> {
        self.with_room_mut(room_id, |room| {
            if let Some(level) = data.level {
                room.level = level;
            }
            if let Some(puzzle) = data.puzzle {
                room.puzzle = puzzle;
            }
            room.clone()
        })
    }

    /// Rewinds both players to the start of the room's current level.
    pub fn reset_players_progress(&self, room_id: &str) -> Option<Room> {
        self.with_room_mut(room_id, |room| {
            reset_players(room);
            room.clone()
        })
    }

    pub fn stats(&self) -> RoomStats {
        let mut stats = RoomStats::default();
        for room in &self.rooms {
            match room.status {
                RoomStatus::Waiting => stats.waiting += 1,
                RoomStatus::Playing => stats.playing += 1,
                RoomStatus::Finished => stats.finished += 1,
            }
            stats.total += 1;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Pulls out unconfirmed rooms past `confirmation_timeout` and finished
    /// rooms past `finished_ttl`.
    pub fn sweep(&self, now: Instant, confirmation_timeout: Duration, finished_ttl: Duration) -> SweptRooms {
        let mut swept = SweptRooms::default();
        self.rooms.retain(|_, room| {
            let age = now.saturating_duration_since(room.created_at);
            match room.status {
                RoomStatus::Waiting if !room.all_ready() && age > confirmation_timeout => {
                    swept.unconfirmed.push(room.clone());
                    false
                }
                RoomStatus::Finished if age > finished_ttl => {
                    swept.expired.push(room.clone());
                    false
                }
                _ => true,
            }
        });
        swept
    }
}

/// `* -> finished`, recording the winner. Returns `false` if the room had
/// already finished.
pub fn mark_finished(room: &mut Room, winner_id: Option<&str>) -> bool {
    if room.status == RoomStatus::Finished {
        return false;
    }
    room.status = RoomStatus::Finished;
    room.winner_id = winner_id.map(str::to_string);
    room.generation += 1;
    true
}

pub const fn apply_player_update(player: &mut Player, update: PlayerUpdate) {
    if let Some(is_ready) = update.is_ready {
        player.is_ready = is_ready;
    }
    if let Some(level) = update.current_level {
        player.current_level = level;
    }
    if let Some(index) = update.current_index {
        player.current_index = index;
    }
    // Failure is a latch; only a fresh level clears it.
    if matches!(update.has_failed, Some(true)) {
        player.has_failed = true;
    }
}

pub fn reset_players(room: &mut Room) {
    let level = room.level;
    for player in &mut room.players {
        player.current_index = 0;
        player.current_level = level;
        player.has_failed = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::game_manager::session::Identity;
    use memory_core::SequencePuzzle;
    use shared::GameType;

    fn player(id: &str) -> Player {
        Player::new(
            Identity {
                id: id.to_string(),
                name: id.to_uppercase(),
            },
            format!("conn-{id}"),
        )
    }

    fn room(id: &str) -> Room {
        Room::new(
            id.to_string(),
            GameType::Sequence,
            [player("p1"), player("p2")],
            Puzzle::Sequence(SequencePuzzle {
                sequence: vec![4],
                grid_size: 3,
            }),
        )
    }

    #[test]
    fn ready_reports_all_ready_only_for_second_player() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("r1"));
        assert!(!rooms.set_player_ready("r1", "p1"));
        assert!(rooms.set_player_ready("r1", "p2"));
        assert!(!rooms.set_player_ready("r1", "stranger"));
        assert!(!rooms.set_player_ready("missing", "p1"));
    }

    #[test]
    fn status_only_moves_forward() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("r1"));

        let started = rooms.start_game("r1").unwrap();
        assert_eq!(started.status, RoomStatus::Playing);
        assert!(rooms.start_game("r1").is_none());

        let ended = rooms.end_game("r1", Some("p2")).unwrap();
        assert_eq!(ended.status, RoomStatus::Finished);
        assert_eq!(ended.winner_id.as_deref(), Some("p2"));

        assert!(rooms.end_game("r1", Some("p1")).is_none());
        assert!(rooms.start_game("r1").is_none());
        assert_eq!(rooms.status("r1"), Some(RoomStatus::Finished));
        assert_eq!(rooms.status("missing"), None);
        let room = rooms.get_room("r1").unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.winner_id.as_deref(), Some("p2"));
    }

    #[test]
    fn phase_changes_bump_generation() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("r1"));
        let g0 = rooms.get_room("r1").unwrap().generation;
        let g1 = rooms.start_game("r1").unwrap().generation;
        let g2 = rooms.end_game("r1", None).unwrap().generation;
        assert!(g0 < g1 && g1 < g2);
    }

    #[test]
    fn opponent_and_player_lookups() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("r1"));
        assert_eq!(rooms.get_opponent("r1", "p1").unwrap().id, "p2");
        assert_eq!(rooms.get_player("r1", "p2").unwrap().name, "P2");
        assert!(rooms.get_opponent("r1", "stranger").is_none());
        assert!(rooms.get_player("nope", "p1").is_none());
    }

    #[test]
    fn failure_latch_survives_updates_until_reset() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("r1"));
        rooms.update_player(
            "r1",
            "p1",
            PlayerUpdate {
                has_failed: Some(true),
                current_index: Some(2),
                ..PlayerUpdate::default()
            },
        );
        let p1 = rooms
            .update_player(
                "r1",
                "p1",
                PlayerUpdate {
                    has_failed: Some(false),
                    ..PlayerUpdate::default()
                },
            )
            .unwrap();
        assert!(p1.has_failed);
        assert_eq!(p1.current_index, 2);

        rooms.update_room_game_data(
            "r1",
            RoomGameData {
                level: Some(3),
                puzzle: None,
            },
        );
        let room = rooms.reset_players_progress("r1").unwrap();
        assert!(room.players.iter().all(|p| p.current_index == 0
            && p.current_level == 3
            && !p.has_failed));
    }

    #[test]
    fn stats_group_by_status() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("a"));
        rooms.create_room(room("b"));
        rooms.create_room(room("c"));
        rooms.start_game("b");
        rooms.start_game("c");
        rooms.end_game("c", None);

        assert_eq!(
            rooms.stats(),
            RoomStats {
                waiting: 1,
                playing: 1,
                finished: 1,
                total: 3,
            }
        );
    }

    #[test]
    fn sweep_drops_unconfirmed_and_expired_rooms() {
        let rooms = RoomRegistry::new();
        rooms.create_room(room("unconfirmed"));
        rooms.create_room(room("confirmed"));
        rooms.set_player_ready("confirmed", "p1");
        rooms.set_player_ready("confirmed", "p2");
        rooms.create_room(room("playing"));
        rooms.start_game("playing");
        rooms.create_room(room("finished"));
        rooms.end_game("finished", None);

        let now = Instant::now();
        let early = rooms.sweep(
            now + Duration::from_secs(5),
            Duration::from_secs(15),
            Duration::from_secs(300),
        );
        assert!(early.unconfirmed.is_empty() && early.expired.is_empty());

        let swept = rooms.sweep(
            now + Duration::from_secs(16),
            Duration::from_secs(15),
            Duration::from_secs(300),
        );
        assert_eq!(swept.unconfirmed.len(), 1);
        assert!(swept.expired.is_empty());
        assert!(!rooms.contains("unconfirmed"));

        let late = rooms.sweep(
            now + Duration::from_secs(301),
            Duration::from_secs(15),
            Duration::from_secs(300),
        );
        assert_eq!(late.expired.len(), 1);
        assert!(rooms.contains("confirmed"));
        assert!(rooms.contains("playing"));
        assert_eq!(rooms.len(), 2);
    }
}
