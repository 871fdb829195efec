use crate::game_manager::engine;
use crate::game_manager::queue::QueuedIdentity;
use crate::game_manager::session::{Identity, Player, RoomStatus};
use crate::game_manager::{AppState, GameError};
use dashmap::mapref::entry::Entry;
use shared::{GameType, ServerMessage};
use std::time::Instant;
use uuid::Uuid;

impl AppState {
    pub fn join_queue(&self, connection_id: &str, requested: &str) {
        let Some(identity) = self.identity_of(connection_id) else {
            return;
        };
        // Unknown ids share the fallback game's partition.
        let game_type_id = GameType::from_id(requested).as_str();

        if !self.rate_limiter.check_request(&identity.id) {
            self.send_to(connection_id, GameError::RateLimited.to_queue_status());
            return;
        }

        if self.in_active_room(&identity.id) {
            tracing::debug!(player_id = %identity.id, "Join ignored: already seated in a match");
            self.send_to(connection_id, GameError::AlreadyInMatch.to_queue_status());
            return;
        }

        let entry = QueuedIdentity {
            identity_id: identity.id.clone(),
            display_name: identity.name.clone(),
            connection_id: connection_id.to_string(),
            game_type_id: game_type_id.to_string(),
            joined_at: Instant::now(),
        };
        if !self.queue.enqueue(entry) {
            tracing::debug!(player_id = %identity.id, game_type = %game_type_id, "Player already in queue");
            self.send_to(connection_id, GameError::AlreadyQueued.to_queue_status());
            return;
        }

        let position = self.queue.position(game_type_id, &identity.id);
        tracing::info!(player_id = %identity.id, game_type = %game_type_id, position, "Player queued");
        self.send_to(
            connection_id,
            ServerMessage::QueueStatus {
                position,
                estimated_wait_secs: self.estimated_wait_secs(position),
                error: None,
            },
        );

        self.attempt_match(game_type_id);
    }

    pub fn leave_queue(&self, connection_id: &str) {
        let Some(identity) = self.identity_of(connection_id) else {
            return;
        };
        if self.queue.remove(&identity.id) > 0 {
            tracing::info!(player_id = %identity.id, "Player left queue");
        }
        self.send_to(
            connection_id,
            ServerMessage::QueueStatus {
                position: 0,
                estimated_wait_secs: 0,
                error: None,
            },
        );
    }

    /// The identity holds a seat in a room that has not finished yet, on
    /// any of its connections. A mapping to a finished room is dropped so the
    /// player can queue again from the result screen.
    pub fn in_active_room(&self, identity_id: &str) -> bool {
        let Some(room_id) = self.identity_rooms.get(identity_id).map(|r| r.value().clone()) else {
            return false;
        };
        if self.seat_is_held(&room_id) {
            return true;
        }
        self.identity_rooms
            .remove_if(identity_id, |_, mapped| *mapped == room_id);
        false
    }

    /// Any status short of finished. A room that is not registered yet
    /// belongs to a match still being created.
    fn seat_is_held(&self, room_id: &str) -> bool {
        self.rooms.status(room_id) != Some(RoomStatus::Finished)
    }

    /// Reserves the identity's one seat for `room_id` under the map's shard
    /// lock, so matches made from two partitions at once cannot both take it.
    fn claim_seat(&self, identity_id: &str, room_id: &str) -> bool {
        match self.identity_rooms.entry(identity_id.to_string()) {
            Entry::Occupied(mut seat) => {
                if self.seat_is_held(seat.get()) {
                    return false;
                }
                seat.insert(room_id.to_string());
            }
            Entry::Vacant(seat) => {
                seat.insert(room_id.to_string());
            }
        }
        true
    }

    fn estimated_wait_secs(&self, position: usize) -> u64 {
        let per_position = self.config.estimated_wait_per_position.as_secs();
        u64::try_from(position).map_or(u64::MAX, |p| p.saturating_mul(per_position))
    }

    /// Pairs the two oldest waiting identities for `game_type_id`.
    ///
    /// A pair with a dead connection or an identity seated elsewhere is
    /// dropped and its eligible half goes back to the front, then the next
    /// pair is tried. Every failed attempt shrinks the partition, so the
    /// loop is bounded by its starting size. Returns the id of the room
    /// created, if any.
    pub fn attempt_match(&self, game_type_id: &str) -> Option<String> {
        let attempts = self.queue.size_of(game_type_id);
        for _ in 0..attempts {
            let (first, second) = self.queue.dequeue_pair(game_type_id)?;

            let room_id = Uuid::new_v4().to_string();
            let first_ok = self.is_live(&first.connection_id) && self.claim_seat(&first.identity_id, &room_id);
            let second_ok = self.is_live(&second.connection_id) && self.claim_seat(&second.identity_id, &room_id);
            if first_ok && second_ok {
                self.create_match(game_type_id, &room_id, &first, &second);
                return Some(room_id);
            }
            for entry in [&first, &second] {
                self.identity_rooms
                    .remove_if(&entry.identity_id, |_, mapped| *mapped == room_id);
            }

            tracing::warn!(
                game_type = %game_type_id,
                first = %first.identity_id,
                first_ok,
                second = %second.identity_id,
                second_ok,
                "Discarding pair with an unavailable player"
            );
            match (first_ok, second_ok) {
                (true, false) => self.queue.requeue_front(first),
                (false, true) => self.queue.requeue_front(second),
                _ => {}
            }
        }
        None
    }

    /// Seats a pair whose seats are already claimed for `room_id` and
    /// withdraws both identities from every partition.
    fn create_match(&self, game_type_id: &str, room_id: &str, first: &QueuedIdentity, second: &QueuedIdentity) {
        let game_type = GameType::from_id(game_type_id);
        for entry in [first, second] {
            self.queue.remove(&entry.identity_id);
        }

        let seat = |q: &QueuedIdentity| {
            Player::new(
                Identity {
                    id: q.identity_id.clone(),
                    name: q.display_name.clone(),
                },
                q.connection_id.clone(),
            )
        };
        let room = engine::create_room(game_type, room_id.to_string(), [seat(first), seat(second)]);
        let [p1, p2] = &room.players;
        let (p1, p2) = (p1.clone(), p2.clone());
        self.rooms.create_room(room);

        for entry in [first, second] {
            self.connection_rooms
                .insert(entry.connection_id.clone(), room_id.to_string());
        }

        tracing::info!(room_id = %room_id, p1 = %p1.id, p2 = %p2.id, game_type = game_type.as_str(), "Match found");

        self.send_to(
            &p1.connection_id,
            ServerMessage::MatchFound {
                opponent: p2.opponent_info(),
                room_id: room_id.to_string(),
                game_type,
            },
        );
        self.send_to(
            &p2.connection_id,
            ServerMessage::MatchFound {
                opponent: p1.opponent_info(),
                room_id: room_id.to_string(),
                game_type,
            },
        );
    }
}
