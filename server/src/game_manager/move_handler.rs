use crate::game_manager::engine;
use crate::game_manager::session::RoomStatus;
use crate::game_manager::AppState;
use shared::EndReason;
use std::sync::Arc;

impl AppState {
    /// Handles both `move` and `chimp_move`; the room's engine interprets `value`.
    pub fn handle_move(self: &Arc<Self>, connection_id: &str, room_id: &str, value: usize) {
        let Some(identity) = self.identity_of(connection_id) else {
            return;
        };
        let Some(room) = self.rooms.get_room(room_id) else {
            return;
        };
        // Non-members get no feedback at all.
        if !room.has_player(&identity.id) || room.status != RoomStatus::Playing {
            return;
        }

        let outcome = engine::process_move(&self.rooms, room.game_type, room_id, &identity.id, value);
        let Some(player) = outcome.player().cloned() else {
            tracing::debug!(room_id = %room_id, player_id = %identity.id, "Move ignored");
            return;
        };

        self.send_to(connection_id, outcome.result_message());

        if !outcome.correct() {
            self.player_failed(room_id, &identity.id);
            return;
        }

        if let Some(opponent) = room.opponent(&identity.id) {
            self.send_to(&opponent.connection_id, outcome.progress_message(&player));
        }

        if !outcome.level_done() {
            return;
        }

        let level = player.current_level;
        self.send_to(connection_id, outcome.player_complete_message(level));

        if let Some(advanced) = engine::advance_if_cleared(&self.rooms, room_id, level) {
            tracing::info!(room_id = %room_id, level = advanced.level, "Level advanced");
            self.cancel_round_timer(room_id);
            self.emit_to_room(&advanced, &engine::level_complete_message(&advanced, &self.config));
            self.schedule_round_start(&advanced);
        }
    }

    /// A wrong click ends the match in the opponent's favour.
    pub fn player_failed(self: &Arc<Self>, room_id: &str, player_id: &str) {
        let winner_id = self
            .rooms
            .get_opponent(room_id, player_id)
            .map(|p| p.id);
        tracing::info!(room_id = %room_id, player_id = %player_id, "Player failed");
        self.finish_match(room_id, winner_id.as_deref(), EndReason::WrongMove, None);
    }
}
