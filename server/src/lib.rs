//! Head-to-head memory puzzle arena.
//!
//! Players queue per game type, get paired into a room, confirm, and then
//! race through the same sequence or chimp puzzle level by level. The room
//! registry is the single source of truth; every socket only ever sees the
//! messages `AppState` routes to it.
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod game_manager;
pub mod ws;
