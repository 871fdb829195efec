use crate::config::TiePolicy;
use crate::game_manager::engine;
use crate::game_manager::rooms::mark_finished;
use crate::game_manager::session::{Room, RoomStatus};
use crate::game_manager::AppState;
use dashmap::DashMap;
use shared::{EndReason, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// At most one round timer and one pending phase transition per room.
#[derive(Default)]
struct RoomTimers {
    round: Option<AbortHandle>,
    /// Countdown, reveal delay or post-match cleanup.
    pending: Option<AbortHandle>,
}

#[derive(Default)]
pub struct TimerRegistry {
    rooms: DashMap<String, RoomTimers>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_round(&self, room_id: &str, task: AbortHandle) {
        let old = self
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .round
            .replace(task);
        if let Some(old) = old {
            old.abort();
        }
    }

    pub fn cancel_round(&self, room_id: &str) {
        let old = self
            .rooms
            .get_mut(room_id)
            .and_then(|mut timers| timers.round.take());
        if let Some(old) = old {
            old.abort();
        }
    }

    pub fn set_pending(&self, room_id: &str, task: AbortHandle) {
        let old = self
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .pending
            .replace(task);
        if let Some(old) = old {
            old.abort();
        }
    }

    pub fn cancel_all(&self, room_id: &str) {
        if let Some((_, timers)) = self.rooms.remove(room_id) {
            for task in timers.round.into_iter().chain(timers.pending) {
                task.abort();
            }
        }
    }

    pub fn has_round(&self, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|t| t.round.as_ref().is_some_and(|r| !r.is_finished()))
    }

    /// Rooms with at least one timer slot in use.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    Winner(usize),
    Draw,
}

/// Decides a timed-out round from each seat's completion and progress.
/// `None` means both finished and the timeout has nothing to resolve.
pub fn timeout_outcome(complete: [bool; 2], progress: [u64; 2], tie: TiePolicy) -> Option<TimeoutOutcome> {
    match complete {
        [true, true] => None,
        [true, false] => Some(TimeoutOutcome::Winner(0)),
        [false, true] => Some(TimeoutOutcome::Winner(1)),
        [false, false] => {
            let [first, second] = progress;
            Some(match first.cmp(&second) {
                std::cmp::Ordering::Greater => TimeoutOutcome::Winner(0),
                std::cmp::Ordering::Less => TimeoutOutcome::Winner(1),
                std::cmp::Ordering::Equal => match tie {
                    TiePolicy::FirstSeat => TimeoutOutcome::Winner(0),
                    TiePolicy::Draw => TimeoutOutcome::Draw,
                },
            })
        }
    }
}

impl AppState {
    /// Starts the per-level countdown, replacing any timer already running
    /// for the room.
    pub fn start_round_timer(self: &Arc<Self>, room_id: &str) {
        self.timers.cancel_round(room_id);

        let Some(room) = self.rooms.get_room(room_id) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }

        let generation = room.generation;
        let total = self.config.round_duration.as_secs();

        let state = Arc::clone(self);
        let id = room_id.to_string();
        let task = tokio::spawn(async move {
            state.emit_to_room_id(
                &id,
                &ServerMessage::RoundTimer {
                    time_left: total,
                    total_time: total,
                },
            );
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;

            for time_left in (0..total).rev() {
                ticker.tick().await;
                if !state.is_current(&id, generation) {
                    return;
                }
                state.emit_to_room_id(
                    &id,
                    &ServerMessage::RoundTimer {
                        time_left,
                        total_time: total,
                    },
                );
            }

            state.resolve_timeout(&id, generation);
        });

        tracing::debug!(room_id = %room_id, level = room.level, seconds = total, "Round timer started");
        self.timers.set_round(room_id, task.abort_handle());
    }

    pub fn cancel_round_timer(&self, room_id: &str) {
        self.timers.cancel_round(room_id);
    }

    /// Room still exists, is playing, and has not moved past `generation`.
    pub fn is_current(&self, room_id: &str, generation: u64) -> bool {
        self.rooms
            .get_room(room_id)
            .is_some_and(|room| room.generation == generation && room.status == RoomStatus::Playing)
    }

    /// Ends the round that `generation` was armed for. The generation check,
    /// the verdict and the move to `finished` happen under one room lock, so
    /// a level advance or another resolution in between turns this into a
    /// no-op.
    pub fn resolve_timeout(self: &Arc<Self>, room_id: &str, generation: u64) {
        let tie = self.config.tie_policy;
        let resolved = self
            .rooms
            .with_room_mut(room_id, |room| {
                if room.generation != generation || room.status != RoomStatus::Playing {
                    return None;
                }
                let winner_id = match timeout_verdict(room, tie)? {
                    TimeoutOutcome::Winner(seat) => room.players.get(seat).map(|p| p.id.clone()),
                    TimeoutOutcome::Draw => None,
                };
                mark_finished(room, winner_id.as_deref()).then(|| (room.clone(), winner_id))
            })
            .flatten();
        let Some((room, winner_id)) = resolved else {
            tracing::debug!(room_id = %room_id, generation, "Timeout is stale or has nothing to resolve");
            return;
        };

        let loser_id = winner_id
            .as_deref()
            .and_then(|w| room.opponent(w))
            .map(|p| p.id.clone());
        tracing::info!(room_id = %room_id, winner = ?winner_id, level = room.level, "Round timed out");
        self.timers.cancel_all(room_id);
        self.announce_end(
            &room,
            winner_id.as_deref(),
            EndReason::Timeout,
            Some(&ServerMessage::Timeout { loser_id }),
        );
    }
}

fn timeout_verdict(room: &Room, tie: TiePolicy) -> Option<TimeoutOutcome> {
    let [first, second] = &room.players;
    timeout_outcome(
        [
            engine::is_player_complete(room, first),
            engine::is_player_complete(room, second),
        ],
        [engine::progress(room, first), engine::progress(room, second)],
        tie,
    )
}
