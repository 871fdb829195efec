use crate::game_manager::engine;
use crate::game_manager::session::{Connection, Identity, Room, RoomStatus, Tx};
use crate::game_manager::{AppState, GameError};
use shared::{CancelReason, EndReason, ServerMessage};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

impl AppState {
    pub fn add_connection(&self, connection_id: String, identity: Identity, tx: Tx) {
        tracing::info!(connection_id = %connection_id, player_id = %identity.id, "Connection added");
        self.connections
            .insert(connection_id, Connection { identity, tx });
    }

    pub fn handle_disconnect(self: &Arc<Self>, connection_id: &str) {
        self.depart(connection_id, EndReason::OpponentDisconnected);
        if let Some((_, conn)) = self.connections.remove(connection_id) {
            tracing::info!(connection_id = %connection_id, player_id = %conn.identity.id, "Connection removed");
        }
    }

    /// Explicit forfeit. Resolves exactly like a disconnect apart from the reason.
    pub fn handle_leave(self: &Arc<Self>, connection_id: &str) {
        self.depart(connection_id, EndReason::OpponentForfeited);
    }

    fn depart(self: &Arc<Self>, connection_id: &str, reason: EndReason) {
        let Some(identity) = self.identity_of(connection_id) else {
            return;
        };
        if self.queue.remove(&identity.id) > 0 {
            tracing::info!(player_id = %identity.id, "Player removed from matchmaking queue");
        }

        let Some(room_id) = self.connection_rooms.get(connection_id).map(|r| r.value().clone()) else {
            return;
        };
        let Some(room) = self.rooms.get_room(&room_id) else {
            self.connection_rooms.remove(connection_id);
            return;
        };

        match room.status {
            RoomStatus::Waiting => {
                tracing::info!(room_id = %room_id, player_id = %identity.id, "Player left before the match started");
                self.emit_to_room(
                    &room,
                    &ServerMessage::MatchCancelled {
                        reason: CancelReason::OpponentLeft,
                    },
                );
                self.cleanup_room(&room_id);
            }
            RoomStatus::Playing => {
                self.connection_rooms.remove(connection_id);
                let winner_id = room.opponent(&identity.id).map(|p| p.id.clone());
                tracing::info!(room_id = %room_id, player_id = %identity.id, reason = ?reason, "Player left a running match");
                self.finish_match(&room_id, winner_id.as_deref(), reason, None);
            }
            RoomStatus::Finished => {
                self.connection_rooms.remove(connection_id);
            }
        }
    }

    pub fn handle_ready(self: &Arc<Self>, connection_id: &str, room_id: &str) {
        let Some(identity) = self.identity_of(connection_id) else {
            return;
        };
        let Some(room) = self
            .rooms
            .get_room(room_id)
            .filter(|room| room.has_player(&identity.id))
        else {
            self.send_to(connection_id, GameError::NotInRoom.to_message());
            return;
        };
        if room.status != RoomStatus::Waiting
            || room.player(&identity.id).is_some_and(|p| p.is_ready)
        {
            tracing::debug!(room_id = %room_id, player_id = %identity.id, "Duplicate ready ignored");
            return;
        }

        if !self.rooms.set_player_ready(room_id, &identity.id) {
            tracing::info!(room_id = %room_id, player_id = %identity.id, "Player ready");
            return;
        }

        let countdown = self.config.countdown;
        tracing::info!(room_id = %room_id, "Both players ready, counting down");
        self.emit_to_room(
            &room,
            &ServerMessage::Countdown {
                seconds: countdown.as_secs(),
            },
        );

        let state = Arc::clone(self);
        let id = room_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(countdown).await;
            state.launch_game(&id);
        });
        self.timers.set_pending(room_id, task.abort_handle());
    }

    /// `waiting -> playing`, deals the opening puzzle and arms the round
    /// timer once the puzzle has been shown.
    pub fn launch_game(self: &Arc<Self>, room_id: &str) {
        let Some(room) = self.rooms.start_game(room_id) else {
            return;
        };
        tracing::info!(room_id = %room_id, game_type = room.game_type.as_str(), "Game started");
        self.emit_to_room(&room, &engine::start_message(&room, &self.config));
        self.schedule_round_start(&room);
    }

    pub fn schedule_round_start(self: &Arc<Self>, room: &Room) {
        let delay = engine::reveal_delay(room, &self.config);
        let generation = room.generation;
        let state = Arc::clone(self);
        let id = room.id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.is_current(&id, generation) {
                state.start_round_timer(&id);
            }
        });
        self.timers.set_pending(&room.id, task.abort_handle());
    }

    /// Ends the match once. `notice` goes out before the `end` event.
    pub fn finish_match(
        self: &Arc<Self>,
        room_id: &str,
        winner_id: Option<&str>,
        reason: EndReason,
        notice: Option<&ServerMessage>,
    ) {
        let Some(room) = self.rooms.end_game(room_id, winner_id) else {
            return;
        };
        self.timers.cancel_all(room_id);
        self.announce_end(&room, winner_id, reason, notice);
    }

    /// Broadcasts the result of a room that just finished and schedules its
    /// cleanup.
    pub fn announce_end(
        self: &Arc<Self>,
        room: &Room,
        winner_id: Option<&str>,
        reason: EndReason,
        notice: Option<&ServerMessage>,
    ) {
        if let Some(notice) = notice {
            self.emit_to_room(room, notice);
        }

        let winner = winner_id.and_then(|id| room.player(id));
        let loser = winner.and_then(|w| room.opponent(&w.id));
        tracing::info!(room_id = %room.id, winner = ?winner_id, reason = ?reason, level = room.level, "Match ended");
        self.emit_to_room(
            room,
            &ServerMessage::End {
                winner_id: winner.map(|p| p.id.clone()),
                loser_id: loser.map(|p| p.id.clone()),
                winner_name: winner.map(|p| p.name.clone()),
                loser_name: loser.map(|p| p.name.clone()),
                reason,
                final_level: room.level,
            },
        );

        self.schedule_cleanup(&room.id);
    }

    fn schedule_cleanup(self: &Arc<Self>, room_id: &str) {
        let grace = self.config.result_grace;
        let state = Arc::clone(self);
        let id = room_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let finished = state
                .rooms
                .get_room(&id)
                .is_some_and(|room| room.status == RoomStatus::Finished);
            if finished {
                state.cleanup_room(&id);
            }
        });
        self.timers.set_pending(room_id, task.abort_handle());
    }

    /// Drops the room with its puzzle state, its timers and its channel members.
    pub fn cleanup_room(&self, room_id: &str) {
        self.timers.cancel_all(room_id);
        if let Some(room) = self.rooms.remove_room(room_id) {
            self.detach_room(&room);
            tracing::info!(room_id = %room_id, "Room cleaned up");
        }
    }

    fn detach_room(&self, room: &Room) {
        for player in &room.players {
            self.connection_rooms
                .remove_if(&player.connection_id, |_, mapped| *mapped == room.id);
            self.identity_rooms
                .remove_if(&player.id, |_, mapped| *mapped == room.id);
        }
    }

    pub fn sweep_queue(&self, now: Instant) -> usize {
        let stale = self.queue.remove_stale(now, self.config.queue_max_wait);
        for entry in &stale {
            tracing::info!(player_id = %entry.identity_id, game_type = %entry.game_type_id, "Queue entry timed out");
            self.send_to(&entry.connection_id, GameError::QueueTimeout.to_queue_status());
        }
        stale.len()
    }

    pub fn sweep_rooms(&self, now: Instant) -> usize {
        let swept = self.rooms.sweep(
            now,
            self.config.confirmation_timeout,
            self.config.finished_room_ttl,
        );
        for room in &swept.unconfirmed {
            tracing::info!(room_id = %room.id, "Match cancelled: confirmation timeout");
            self.emit_to_room(
                room,
                &ServerMessage::MatchCancelled {
                    reason: CancelReason::ConfirmationTimeout,
                },
            );
        }
        for room in swept.unconfirmed.iter().chain(&swept.expired) {
            self.timers.cancel_all(&room.id);
            self.detach_room(room);
        }
        swept.unconfirmed.len() + swept.expired.len()
    }

    pub fn sweep_rate_limits(&self, now: Instant) -> usize {
        self.rate_limiter.sweep(now)
    }

    /// Spawns the queue, room and rate limit sweeps. Calling it again while
    /// they run does nothing.
    pub fn start_sweepers(self: &Arc<Self>) {
        let mut sweepers = self.sweepers.lock().unwrap_or_else(PoisonError::into_inner);
        if !sweepers.is_empty() {
            return;
        }
        sweepers.push(self.spawn_sweeper("queue", self.config.queue_sweep_interval, Self::sweep_queue));
        sweepers.push(self.spawn_sweeper("rooms", self.config.room_sweep_interval, Self::sweep_rooms));
        sweepers.push(self.spawn_sweeper(
            "rate_limits",
            self.config.rate_limit_sweep_interval,
            Self::sweep_rate_limits,
        ));
        tracing::info!("Background sweeps started");
    }

    pub fn stop_sweepers(&self) {
        let mut sweepers = self.sweepers.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in sweepers.drain(..) {
            handle.abort();
        }
    }

    pub fn sweepers_running(&self) -> bool {
        !self
            .sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn spawn_sweeper(
        self: &Arc<Self>,
        name: &'static str,
        period: Duration,
        sweep: fn(&Self, Instant) -> usize,
    ) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sweep(&state, Instant::now());
                if removed > 0 {
                    tracing::debug!(sweep = name, removed, "Sweep evicted entries");
                }
            }
        })
    }
}
