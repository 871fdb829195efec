use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedIdentity {
    pub identity_id: String,
    pub display_name: String,
    pub connection_id: String,
    pub game_type_id: String,
    pub joined_at: Instant,
}

/// FIFO waiting lists, one per game type id.
///
/// Each partition sits behind its own shard lock, so a pair is taken out
/// atomically with respect to other joins for the same game type. A
/// partition that runs empty is dropped.
#[derive(Default)]
pub struct MatchmakingQueue {
    partitions: DashMap<String, VecDeque<QueuedIdentity>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the identity. Returns `false` if it already waits for this game type.
    pub fn enqueue(&self, identity: QueuedIdentity) -> bool {
        let mut partition = self
            .partitions
            .entry(identity.game_type_id.clone())
            .or_default();
        if partition
            .iter()
            .any(|q| q.identity_id == identity.identity_id)
        {
            return false;
        }
        partition.push_back(identity);
        true
    }

    /// Removes and returns the two oldest entries, or nothing if fewer than two wait.
    pub fn dequeue_pair(&self, game_type_id: &str) -> Option<(QueuedIdentity, QueuedIdentity)> {
        let pair = {
            let mut partition = self.partitions.get_mut(game_type_id)?;
            if partition.len() < 2 {
                return None;
            }
            let first = partition.pop_front()?;
            let second = partition.pop_front()?;
            (first, second)
        };
        self.partitions
            .remove_if(game_type_id, |_, partition| partition.is_empty());
        Some(pair)
    }

    /// Puts the identity back at the head of its partition.
    pub fn requeue_front(&self, identity: QueuedIdentity) {
        let mut partition = self
            .partitions
            .entry(identity.game_type_id.clone())
            .or_default();
        partition.retain(|q| q.identity_id != identity.identity_id);
        partition.push_front(identity);
    }

    /// Removes the identity from every partition. Returns how many entries went away.
    pub fn remove(&self, identity_id: &str) -> usize {
        let mut removed = 0;
        self.partitions.retain(|_, partition| {
            let before = partition.len();
            partition.retain(|q| q.identity_id != identity_id);
            removed += before - partition.len();
            !partition.is_empty()
        });
        removed
    }

    /// 1-indexed position, 0 when absent.
    pub fn position(&self, game_type_id: &str, identity_id: &str) -> usize {
        self.partitions
            .get(game_type_id)
            .and_then(|p| p.iter().position(|q| q.identity_id == identity_id))
            .map_or(0, |index| index + 1)
    }

    pub fn size_of(&self, game_type_id: &str) -> usize {
        self.partitions.get(game_type_id).map_or(0, |p| p.len())
    }

    pub fn total_size(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    pub fn stats_by_game_type(&self) -> HashMap<String, usize> {
        self.partitions
            .iter()
            .map(|p| (p.key().clone(), p.len()))
            .collect()
    }

    /// Evicts entries that waited longer than `max_wait` and returns them.
    pub fn remove_stale(&self, now: Instant, max_wait: Duration) -> Vec<QueuedIdentity> {
        let mut stale = Vec::new();
        self.partitions.retain(|_, partition| {
            let (keep, expired): (VecDeque<_>, VecDeque<_>) = partition
                .drain(..)
                .partition(|q| now.saturating_duration_since(q.joined_at) <= max_wait);
            *partition = keep;
            stale.extend(expired);
            !partition.is_empty()
        });
        stale
    }
}
