use std::cmp::Ordering;

use skyrace_shared::AgentId;
use tracing::debug;

/// One racer's ranking key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankEntry {
    pub id: AgentId,
    pub total_checkpoints: u32,
    pub distance_to_next: f32,
}

/// Order racers: most checkpoints first, then nearest to their next
/// checkpoint, then lowest id so the order is total and repeatable.
pub fn compare(a: &RankEntry, b: &RankEntry) -> Ordering {
    b.total_checkpoints
        .cmp(&a.total_checkpoints)
        .then_with(|| a.distance_to_next.total_cmp(&b.distance_to_next))
        .then_with(|| a.id.cmp(&b.id))
}

/// Assign dense 1-based ranks. Output is in standing order.
pub fn rank(entries: &[RankEntry]) -> Vec<(AgentId, u32)> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(compare);
    sorted
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i as u32 + 1))
        .collect()
}

/// Recomputes standings at a fixed cadence of race time rather than every tick.
#[derive(Debug, Clone)]
pub struct RaceRanker {
    interval: f32,
    last_update: Option<f32>,
}

impl RaceRanker {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            last_update: None,
        }
    }

    pub fn is_due(&self, race_time: f32) -> bool {
        match self.last_update {
            None => true,
            Some(last) => race_time >= last + self.interval,
        }
    }

    /// Rank now, regardless of cadence.
    pub fn force(&mut self, race_time: f32, entries: &[RankEntry]) -> Vec<(AgentId, u32)> {
        self.last_update = Some(race_time);
        let ranks = rank(entries);
        debug!(racers = ranks.len(), race_time, "standings recomputed");
        ranks
    }

    /// Rank if the cadence interval has elapsed since the last pass.
    pub fn poll(&mut self, race_time: f32, entries: &[RankEntry]) -> Option<Vec<(AgentId, u32)>> {
        if !self.is_due(race_time) {
            return None;
        }
        Some(self.force(race_time, entries))
    }

    pub fn reset(&mut self) {
        self.last_update = None;
    }
}

/// English ordinal for a 1-based place ("1st", "12th", "23rd"); empty for 0.
pub fn ordinal(place: u32) -> String {
    if place == 0 {
        return String::new();
    }
    let suffix = match (place % 10, place % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{place}{suffix}")
}
