use std::collections::BTreeMap;
use std::ops::Index;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skyrace_shared::{AgentId, RaceConfig, RaceError};
use tracing::{debug, info, warn};

use crate::track::CheckpointTrack;

/// Race progress for one aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentProgress {
    pub next_checkpoint: usize,
    /// Starts at 1; incremented each time `next_checkpoint` wraps to 0.
    pub lap: u32,
    pub time_remaining: f32,
    /// 1-based standing, 0 until the first ranking pass.
    pub rank: u32,
}

impl AgentProgress {
    fn start(next_checkpoint: usize, bonus_time: f32) -> Self {
        Self {
            next_checkpoint,
            lap: 1,
            time_remaining: bonus_time,
            rank: 0,
        }
    }

    /// Checkpoints passed since the start, the primary ranking key.
    pub fn total_checkpoints(&self, checkpoint_count: usize) -> u32 {
        self.next_checkpoint as u32 + (self.lap - 1) * checkpoint_count as u32
    }
}

/// What happened to one aircraft's progress during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressEvent {
    pub advanced: bool,
    pub lap_completed: bool,
    /// Time budget ran out; the aircraft must be put back on the track.
    pub expired: bool,
    /// The primary aircraft has finished the last lap.
    pub race_complete: bool,
}

/// Tracks checkpoint index, lap and time budget for every aircraft.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    agents: BTreeMap<AgentId, AgentProgress>,
    checkpoint_count: usize,
    bonus_time: f32,
    checkpoint_radius: f32,
    trigger_radius: f32,
    num_laps: u32,
    primary: AgentId,
}

impl ProgressTracker {
    pub fn new(
        config: &RaceConfig,
        track: &CheckpointTrack,
        agents: &[AgentId],
        primary: AgentId,
    ) -> Result<Self, RaceError> {
        if agents.is_empty() {
            return Err(RaceError::NoAgents);
        }
        if !agents.contains(&primary) {
            return Err(RaceError::InvalidConfig(format!(
                "primary {primary} is not one of the racers"
            )));
        }
        config.validate()?;

        let agents = agents
            .iter()
            .map(|&id| (id, AgentProgress::start(0, config.checkpoint_bonus_time)))
            .collect();
        Ok(Self {
            agents,
            checkpoint_count: track.count(),
            bonus_time: config.checkpoint_bonus_time,
            checkpoint_radius: config.checkpoint_radius,
            trigger_radius: config.trigger_radius,
            num_laps: config.num_laps,
            primary,
        })
    }

    pub fn primary(&self) -> AgentId {
        self.primary
    }

    pub fn num_laps(&self) -> u32 {
        self.num_laps
    }

    pub fn bonus_time(&self) -> f32 {
        self.bonus_time
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoint_count
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentProgress> {
        self.agents.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &AgentProgress)> {
        self.agents.iter().map(|(&id, p)| (id, p))
    }

    fn entry(&mut self, id: AgentId) -> &mut AgentProgress {
        match self.agents.get_mut(&id) {
            Some(p) => p,
            None => panic!("no progress tracked for {id}"),
        }
    }

    pub fn total_checkpoints(&self, id: AgentId) -> u32 {
        self[id].total_checkpoints(self.checkpoint_count)
    }

    pub fn set_rank(&mut self, id: AgentId, rank: u32) {
        self.entry(id).rank = rank;
    }

    /// Restart an aircraft's progress, e.g. for a new training episode.
    pub fn restart(&mut self, id: AgentId, next_checkpoint: usize) {
        let fresh = AgentProgress::start(next_checkpoint % self.checkpoint_count, self.bonus_time);
        let p = self.entry(id);
        *p = AgentProgress { rank: p.rank, ..fresh };
    }

    /// Whether `from -> to` reached the aircraft's next checkpoint, either
    /// by proximity or by sweeping through the gate.
    pub fn reached_next(&self, id: AgentId, track: &CheckpointTrack, from: Vec3, to: Vec3) -> bool {
        let checkpoint = track.at(self[id].next_checkpoint);
        to.distance(checkpoint.position()) < self.checkpoint_radius
            || checkpoint.swept_through(from, to, self.trigger_radius)
    }

    /// One tick of progress for an aircraft that moved `from -> to`.
    /// A checkpoint is counted at most once per tick, and a tick that
    /// advances refills the budget without decaying it.
    pub fn on_step(
        &mut self,
        id: AgentId,
        track: &CheckpointTrack,
        from: Vec3,
        to: Vec3,
        dt: f32,
    ) -> ProgressEvent {
        if self.reached_next(id, track, from, to) {
            return self.advance(id, track);
        }
        self.decay(id, dt)
    }

    /// Count the aircraft's next checkpoint as passed.
    pub fn advance(&mut self, id: AgentId, track: &CheckpointTrack) -> ProgressEvent {
        let bonus = self.bonus_time;
        let (num_laps, is_primary) = (self.num_laps, id == self.primary);
        let p = self.entry(id);

        let passed = p.next_checkpoint;
        p.next_checkpoint = track.next(p.next_checkpoint);
        p.time_remaining = bonus;

        let mut event = ProgressEvent {
            advanced: true,
            ..Default::default()
        };
        debug!(agent = %id, checkpoint = passed, "checkpoint passed");

        if p.next_checkpoint == 0 {
            p.lap += 1;
            event.lap_completed = true;
            info!(agent = %id, lap = p.lap, "lap completed");
            if is_primary && p.lap > num_laps {
                event.race_complete = true;
                info!(agent = %id, "primary racer finished the final lap");
            }
        }
        event
    }

    fn decay(&mut self, id: AgentId, dt: f32) -> ProgressEvent {
        let bonus = self.bonus_time;
        let p = self.entry(id);
        p.time_remaining = (p.time_remaining - dt).max(0.0);
        if p.time_remaining > 0.0 {
            return ProgressEvent::default();
        }
        warn!(agent = %id, next = p.next_checkpoint, "time budget expired");
        p.time_remaining = bonus;
        ProgressEvent {
            expired: true,
            ..Default::default()
        }
    }
}

impl Index<AgentId> for ProgressTracker {
    type Output = AgentProgress;

    fn index(&self, id: AgentId) -> &AgentProgress {
        match self.agents.get(&id) {
            Some(p) => p,
            None => panic!("no progress tracked for {id}"),
        }
    }
}
