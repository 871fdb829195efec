use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Who wins a round timeout when neither player finished and both got equally far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TiePolicy {
    /// The player seated first at match creation wins.
    #[default]
    FirstSeat,
    /// Nobody wins.
    Draw,
}

/// Timings and limits for matchmaking and match play.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_sweep_interval: Duration,

    pub queue_max_wait: Duration,
    pub queue_sweep_interval: Duration,
    pub estimated_wait_per_position: Duration,

    pub confirmation_timeout: Duration,
    pub finished_room_ttl: Duration,
    pub room_sweep_interval: Duration,

    pub countdown: Duration,
    pub round_duration: Duration,
    pub result_grace: Duration,
    pub chimp_memorize: Duration,
    pub sequence_step_ms: u64,
    pub sequence_tail_ms: u64,

    pub tie_policy: TiePolicy,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_sweep_interval: Duration::from_secs(60),

            queue_max_wait: Duration::from_secs(5 * 60),
            queue_sweep_interval: Duration::from_secs(30),
            estimated_wait_per_position: Duration::from_secs(10),

            confirmation_timeout: Duration::from_secs(15),
            finished_room_ttl: Duration::from_secs(5 * 60),
            room_sweep_interval: Duration::from_secs(10),

            countdown: Duration::from_secs(3),
            round_duration: Duration::from_secs(30),
            result_grace: Duration::from_secs(30),
            chimp_memorize: Duration::from_secs(2),
            sequence_step_ms: 1000,
            sequence_tail_ms: 500,

            tie_policy: TiePolicy::FirstSeat,
        }
    }
}

/// Command line / environment options for the arena server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct ServerArgs {
    /// Address to bind to
    #[clap(short = 'H', long, env = "ARENA_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Port to listen on
    #[clap(short, long, env = "ARENA_PORT", default_value = "3000")]
    pub port: u16,
    /// Seconds allowed per level before the round times out
    #[clap(long, env = "ARENA_ROUND_SECONDS", default_value = "30")]
    pub round_seconds: u64,
    /// Timeout resolution when both players got equally far
    #[clap(long, env = "ARENA_TIE_POLICY", value_enum, default_value_t = TiePolicy::FirstSeat)]
    pub tie_policy: TiePolicy,
}

impl ServerArgs {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            round_duration: Duration::from_secs(self.round_seconds.max(1)),
            tie_policy: self.tie_policy,
            ..ArenaConfig::default()
        }
    }
}
