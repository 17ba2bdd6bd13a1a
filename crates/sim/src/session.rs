use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use skyrace_shared::*;
use tracing::{debug, info};

use crate::flight::{Aircraft, FlightController};
use crate::observation::observe;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::race_state::{ObserverHandle, RaceContext, StateChange, StateObserver};
use crate::ranking::{ordinal, RaceRanker, RankEntry};
use crate::reward::{RewardShaper, StepReward};
use crate::sensors::Arena;
use crate::track::CheckpointTrack;

/// Timed disabled interval after hitting an obstacle: frozen, then moved
/// back to the last completed checkpoint, then released. Times are race time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recovery {
    pub reposition_at: f64,
    pub resume_at: f64,
    pub repositioned: bool,
}

#[derive(Debug, Clone)]
pub struct Racer {
    pub id: AgentId,
    pub name: String,
    /// Grid slot, used for the sideways spawn offset.
    pub slot: usize,
    pub body: Aircraft,
    /// Held still by the race lifecycle (countdown, pause, finish).
    pub frozen: bool,
    pub recovery: Option<Recovery>,
    pub shaper: RewardShaper,
}

impl Racer {
    /// Whether this racer's controls take effect this tick.
    pub fn is_active(&self) -> bool {
        !self.frozen && self.recovery.is_none() && self.shaper.end().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTick {
    pub id: AgentId,
    pub event: ProgressEvent,
    pub reward: StepReward,
    pub collided: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u32,
    pub state: RaceState,
    pub agents: Vec<AgentTick>,
    pub changes: Vec<StateChange>,
    pub ranked: bool,
}

impl TickReport {
    pub fn agent(&self, id: AgentId) -> Option<&AgentTick> {
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Full state of one race: the track, every racer, and the lifecycle.
#[derive(Debug)]
pub struct RaceSession {
    config: RaceConfig,
    track: CheckpointTrack,
    arena: Arena,
    controller: FlightController,
    racers: Vec<Racer>,
    progress: ProgressTracker,
    ranker: RaceRanker,
    context: RaceContext,
    tick: u32,
    /// Tick at which the countdown hands over to play.
    countdown_ends_at: Option<u32>,
    rng: Pcg64,
}

impl RaceSession {
    /// Set up a race with one racer per name. Racer `primary` decides when
    /// the race ends.
    pub fn new(
        config: RaceConfig,
        track: CheckpointTrack,
        arena: Arena,
        names: &[String],
        primary: AgentId,
        seed: u64,
    ) -> Result<Self, RaceError> {
        config.validate()?;
        if names.is_empty() {
            return Err(RaceError::NoAgents);
        }
        let ids: Vec<AgentId> = (0..names.len()).map(AgentId).collect();
        let progress = ProgressTracker::new(&config, &track, &ids, primary)?;

        let racers = names
            .iter()
            .enumerate()
            .map(|(slot, name)| Racer {
                id: AgentId(slot),
                name: name.clone(),
                slot,
                body: Aircraft::at(track.spawn_pose(0, slot, names.len(), config.spawn_spacing)),
                frozen: true,
                recovery: None,
                shaper: RewardShaper::new(config.reward, config.mode),
            })
            .collect();

        Ok(Self {
            controller: FlightController::new(config.flight),
            ranker: RaceRanker::new(config.rank_interval),
            config,
            track,
            arena,
            racers,
            progress,
            context: RaceContext::new(),
            tick: 0,
            countdown_ends_at: None,
            rng: Pcg64::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track(&self) -> &CheckpointTrack {
        &self.track
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn racers(&self) -> &[Racer] {
        &self.racers
    }

    pub fn racer(&self, id: AgentId) -> &Racer {
        &self.racers[id.0]
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn state(&self) -> RaceState {
        self.context.state()
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Simulation time since the session was created.
    pub fn now(&self) -> f64 {
        self.tick as f64 * self.config.dt as f64
    }

    pub fn race_time(&self) -> f64 {
        self.context.race_time(self.now())
    }

    pub fn subscribe(&mut self, observer: StateObserver) -> ObserverHandle {
        self.context.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        self.context.unsubscribe(handle)
    }

    /// Start the countdown. With no countdown configured, play starts at once.
    pub fn begin(&mut self) -> Result<Vec<StateChange>, RaceError> {
        let mut changes = vec![self.transition(RaceState::Countdown)?];
        if self.config.countdown_secs <= 0.0 {
            changes.push(self.transition(RaceState::Playing)?);
        } else {
            let ticks = (self.config.countdown_secs / self.config.dt).round() as u32;
            self.countdown_ends_at = Some(self.tick + ticks.max(1));
        }
        Ok(changes)
    }

    pub fn pause(&mut self) -> Result<StateChange, RaceError> {
        self.transition(RaceState::Paused)
    }

    pub fn resume(&mut self) -> Result<StateChange, RaceError> {
        self.transition(RaceState::Playing)
    }

    /// Leave a finished race and put everyone back on the grid.
    pub fn return_to_grid(&mut self) -> Result<StateChange, RaceError> {
        self.transition(RaceState::Idle)
    }

    fn transition(&mut self, to: RaceState) -> Result<StateChange, RaceError> {
        let now = self.now();
        let change = self.context.transition(to, now)?;
        match (change.from, change.to) {
            (RaceState::Countdown, RaceState::Playing) => {
                self.countdown_ends_at = None;
                self.set_frozen(false);
                self.rerank();
            }
            (_, RaceState::Playing) => self.set_frozen(false),
            (_, RaceState::Paused) => self.set_frozen(true),
            (_, RaceState::Finished) => {
                self.set_frozen(true);
                self.rerank();
                info!(
                    race_time = change.race_time,
                    winner = %self.standings()[0].name,
                    "race finished"
                );
            }
            (_, RaceState::Idle) => self.reset_grid(),
            _ => {}
        }
        Ok(change)
    }

    fn set_frozen(&mut self, frozen: bool) {
        for racer in &mut self.racers {
            racer.frozen = frozen;
            if frozen {
                racer.body.flight.halt();
            }
        }
    }

    fn reset_grid(&mut self) {
        let slots = self.racers.len();
        self.ranker.reset();
        self.countdown_ends_at = None;
        for racer in &mut self.racers {
            self.progress.restart(racer.id, 0);
            self.progress.set_rank(racer.id, 0);
            racer.body.teleport(self.track.spawn_pose(0, racer.slot, slots, self.config.spawn_spacing));
            racer.recovery = None;
            racer.frozen = true;
            racer.shaper.begin_episode();
        }
    }

    fn rank_entries(&self) -> Vec<RankEntry> {
        self.racers
            .iter()
            .map(|r| {
                let p = &self.progress[r.id];
                RankEntry {
                    id: r.id,
                    total_checkpoints: p.total_checkpoints(self.track.count()),
                    distance_to_next: r.body.position.distance(self.track.at(p.next_checkpoint).position()),
                }
            })
            .collect()
    }

    fn apply_ranks(&mut self, ranks: Vec<(AgentId, u32)>) {
        for (id, rank) in ranks {
            self.progress.set_rank(id, rank);
        }
    }

    fn rerank(&mut self) {
        let entries = self.rank_entries();
        let ranks = self.ranker.force(self.race_time() as f32, &entries);
        self.apply_ranks(ranks);
    }

    /// Move a racer back to the checkpoint before its next one, at rest.
    fn reposition(&mut self, id: AgentId) {
        let next = self.progress[id].next_checkpoint;
        let slots = self.racers.len();
        let racer = &mut self.racers[id.0];
        let pose = self.track.spawn_pose(next, racer.slot, slots, self.config.spawn_spacing);
        racer.body.teleport(pose);
        debug!(agent = %id, checkpoint = self.track.previous(next), "repositioned");
    }

    /// Observation for racer `id` in the current state.
    pub fn observe(&self, id: AgentId) -> Observation {
        let racer = self.racer(id);
        let next = self.track.at(self.progress[id].next_checkpoint);
        observe(&racer.body, next, &self.arena)
    }

    /// Restart the random stream used for episode start positions.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg64::seed_from_u64(seed);
    }

    /// Begin a fresh training episode for `id`. With `randomize`, the racer
    /// starts before a random checkpoint instead of the finish line.
    pub fn reset_episode(&mut self, id: AgentId, randomize: bool) {
        let next = if randomize {
            self.rng.gen_range(0..self.track.count())
        } else {
            0
        };
        self.progress.restart(id, next);
        self.reposition(id);
        let racer = &mut self.racers[id.0];
        racer.recovery = None;
        racer.shaper.begin_episode();
    }

    /// Contact reported for racer `id`. Other aircraft are ignored; anything
    /// else ends a training episode or starts the disabled interval.
    pub fn report_contact(&mut self, id: AgentId, kind: ContactKind) -> StepReward {
        match kind {
            ContactKind::Agent => StepReward::default(),
            ContactKind::Obstacle => self.crash(id),
        }
    }

    fn crash(&mut self, id: AgentId) -> StepReward {
        let race_time = self.race_time();
        let (disabled, recovery) = (self.config.disabled_secs as f64, self.config.recovery_secs as f64);
        let racer = &mut self.racers[id.0];
        match self.config.mode {
            RaceMode::Training => {
                racer.body.flight.halt();
                racer.shaper.on_collision()
            }
            RaceMode::Interactive => {
                if racer.recovery.is_none() {
                    racer.body.flight.halt();
                    racer.recovery = Some(Recovery {
                        reposition_at: race_time + disabled,
                        resume_at: race_time + disabled + recovery,
                        repositioned: false,
                    });
                    info!(agent = %id, "crashed, disabled");
                }
                StepReward::default()
            }
        }
    }

    fn run_recoveries(&mut self, race_time: f64) {
        for i in 0..self.racers.len() {
            let Some(mut rec) = self.racers[i].recovery else {
                continue;
            };
            if !rec.repositioned && race_time >= rec.reposition_at {
                self.reposition(AgentId(i));
                rec.repositioned = true;
            }
            self.racers[i].recovery = if rec.repositioned && race_time >= rec.resume_at {
                debug!(agent = %AgentId(i), "back in the race");
                None
            } else {
                Some(rec)
            };
        }
    }

    /// Advance one fixed tick with one control input per racer.
    pub fn step(&mut self, inputs: &[ControlInput]) -> Result<TickReport, RaceError> {
        if inputs.len() != self.racers.len() {
            return Err(RaceError::InputCount {
                expected: self.racers.len(),
                got: inputs.len(),
            });
        }
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        if let Some(at) = self.countdown_ends_at {
            if self.tick >= at {
                report.changes.push(self.transition(RaceState::Playing)?);
            }
        }
        if !self.context.is_playing() {
            report.state = self.state();
            return Ok(report);
        }

        let race_time = self.race_time();
        self.run_recoveries(race_time);

        let dt = self.config.dt;
        let mut complete = false;
        for (i, input) in inputs.iter().enumerate() {
            let id = AgentId(i);
            if !self.racers[i].is_active() {
                continue;
            }

            let racer = &mut self.racers[i];
            let from = racer.body.position;
            let thrust = self.controller.step(&mut racer.body.flight, *input, dt);
            racer.body.integrate(thrust, &self.config.flight, dt);
            let to = racer.body.position;

            if self.arena.touches_obstacle(to, AIRCRAFT_RADIUS) {
                let reward = self.crash(id);
                report.agents.push(AgentTick {
                    id,
                    event: ProgressEvent::default(),
                    reward,
                    collided: true,
                });
                continue;
            }

            let event = self.progress.on_step(id, &self.track, from, to, dt);
            if event.expired {
                self.reposition(id);
            }
            complete |= event.race_complete;
            let reward = self.racers[i].shaper.on_step(&event);
            report.agents.push(AgentTick {
                id,
                event,
                reward,
                collided: false,
            });
        }

        let entries = self.rank_entries();
        if let Some(ranks) = self.ranker.poll(race_time as f32, &entries) {
            self.apply_ranks(ranks);
            report.ranked = true;
        }

        if complete && self.config.mode == RaceMode::Interactive {
            report.changes.push(self.transition(RaceState::Finished)?);
        }
        report.state = self.state();
        Ok(report)
    }

    /// Current standings, best first.
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .racers
            .iter()
            .map(|r| {
                let p = &self.progress[r.id];
                Standing {
                    id: r.id,
                    name: r.name.clone(),
                    rank: p.rank,
                    place: ordinal(p.rank),
                    lap: p.lap,
                    checkpoints: p.total_checkpoints(self.track.count()),
                }
            })
            .collect();
        standings.sort_by_key(|s| (s.rank == 0, s.rank, s.id));
        standings
    }

    pub fn snapshot(&self) -> RaceFrame {
        RaceFrame {
            tick: self.tick,
            race_time: self.race_time() as f32,
            state: self.state(),
            agents: self
                .racers
                .iter()
                .map(|r| {
                    let p = &self.progress[r.id];
                    let f = &r.body.flight;
                    AgentSnapshot {
                        id: r.id,
                        x: r.body.position.x,
                        y: r.body.position.y,
                        z: r.body.position.z,
                        pitch: f.pitch,
                        yaw: f.yaw,
                        roll: f.roll,
                        speed: r.body.speed(),
                        next_checkpoint: p.next_checkpoint,
                        lap: p.lap,
                        rank: p.rank,
                        time_remaining: p.time_remaining,
                        disabled: r.recovery.is_some(),
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::WaypointPath;
    use glam::Vec3;

    fn square() -> CheckpointTrack {
        CheckpointTrack::from_geometry(&WaypointPath::new(vec![
            Vec3::new(0.0, 200.0, 0.0),
            Vec3::new(0.0, 200.0, 600.0),
            Vec3::new(600.0, 200.0, 600.0),
            Vec3::new(600.0, 200.0, 0.0),
        ]))
        .unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("racer{i}")).collect()
    }

    fn session(config: RaceConfig, n: usize) -> RaceSession {
        let track = square();
        let arena = Arena::around(&track, config.checkpoint_radius);
        RaceSession::new(config, track, arena, &names(n), AgentId(0), 7).unwrap()
    }

    fn idle(n: usize) -> Vec<ControlInput> {
        vec![ControlInput::none(); n]
    }

    #[test]
    fn test_no_racers_is_fatal() {
        let track = square();
        let err = RaceSession::new(RaceConfig::default(), track, Arena::new(), &[], AgentId(0), 0);
        assert!(matches!(err, Err(RaceError::NoAgents)));
    }

    #[test]
    fn test_wrong_input_count() {
        let mut s = session(RaceConfig::default(), 2);
        assert!(matches!(
            s.step(&idle(1)),
            Err(RaceError::InputCount { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_countdown_gates_movement() {
        let mut s = session(RaceConfig::default(), 2);
        s.begin().unwrap();
        let start = s.racer(AgentId(0)).body.position;
        let countdown_ticks = (COUNTDOWN_SECS / DT).round() as u32;
        for _ in 0..countdown_ticks - 1 {
            let report = s.step(&idle(2)).unwrap();
            assert_eq!(report.state, RaceState::Countdown);
        }
        assert_eq!(s.racer(AgentId(0)).body.position, start);
        assert_eq!(s.race_time(), 0.0);

        let report = s.step(&idle(2)).unwrap();
        assert_eq!(report.state, RaceState::Playing);
        assert_eq!(report.changes.len(), 1);
        assert_ne!(s.racer(AgentId(0)).body.position, start);
        // Entering play ranks everyone.
        let mut ranks: Vec<u32> = s.progress().iter().map(|(_, p)| p.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..Default::default()
        };
        let mut s = session(config, 1);
        s.begin().unwrap();
        for _ in 0..10 {
            s.step(&idle(1)).unwrap();
        }
        s.pause().unwrap();
        let frozen_at = s.racer(AgentId(0)).body;
        let time = s.race_time();
        let budget = s.progress()[AgentId(0)].time_remaining;
        for _ in 0..50 {
            s.step(&idle(1)).unwrap();
        }
        assert_eq!(s.racer(AgentId(0)).body, frozen_at);
        assert_eq!(s.race_time(), time);
        assert_eq!(s.progress()[AgentId(0)].time_remaining, budget);

        s.resume().unwrap();
        s.step(&idle(1)).unwrap();
        assert!(s.race_time() > time);
        assert_ne!(s.racer(AgentId(0)).body.position, frozen_at.position);
    }

    #[test]
    fn test_idle_racer_reaches_first_checkpoint() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..Default::default()
        };
        let mut s = session(config, 1);
        s.begin().unwrap();
        let mut advanced = false;
        for _ in 0..(20.0 / DT) as usize {
            let report = s.step(&idle(1)).unwrap();
            if report.agent(AgentId(0)).is_some_and(|a| a.event.advanced) {
                advanced = true;
                break;
            }
        }
        assert!(advanced, "a racer spawned facing checkpoint 0 should reach it");
        assert_eq!(s.progress()[AgentId(0)].next_checkpoint, 1);
    }

    #[test]
    fn test_crash_disables_then_repositions() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..Default::default()
        };
        let mut s = session(config, 1);
        s.begin().unwrap();
        s.step(&idle(1)).unwrap();
        let id = AgentId(0);

        assert_eq!(s.report_contact(id, ContactKind::Agent), StepReward::default());
        assert!(s.racer(id).recovery.is_none());

        s.report_contact(id, ContactKind::Obstacle);
        assert!(s.racer(id).recovery.is_some());
        assert_eq!(s.racer(id).body.speed(), 0.0);
        let crashed_at = s.racer(id).body.position;

        let spawn = s.track().spawn_pose(0, 0, 1, SPAWN_SPACING).position;
        let disabled_ticks = (DISABLED_SECS / DT).round() as usize;
        for _ in 0..disabled_ticks - 2 {
            s.step(&idle(1)).unwrap();
        }
        assert_eq!(s.racer(id).body.position, crashed_at);
        for _ in 0..3 {
            s.step(&idle(1)).unwrap();
        }
        assert!(s.racer(id).body.position.distance(spawn) < 1e-3);
        assert!(s.racer(id).recovery.is_some());

        let recovery_ticks = (RECOVERY_SECS / DT).round() as usize;
        for _ in 0..recovery_ticks + 1 {
            s.step(&idle(1)).unwrap();
        }
        assert!(s.racer(id).recovery.is_none());
        assert_eq!(s.state(), RaceState::Playing);
    }

    #[test]
    fn test_obstacle_contact_detected_in_step() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..RaceConfig::training()
        };
        let track = square();
        let spawn = track.spawn_pose(0, 0, 1, SPAWN_SPACING);
        let arena = Arena::around(&track, 30.0).with_obstacle(spawn.position + spawn.forward() * 3.0, 2.0);
        let mut s = RaceSession::new(config, track, arena, &names(1), AgentId(0), 1).unwrap();
        s.begin().unwrap();
        let report = s.step(&idle(1)).unwrap();
        let tick = report.agent(AgentId(0)).unwrap();
        assert!(tick.collided);
        assert!(tick.reward.done);
        assert_eq!(tick.reward.end, Some(EpisodeEnd::Collision));

        // Finished episodes sit still until reset.
        let report = s.step(&idle(1)).unwrap();
        assert!(report.agent(AgentId(0)).is_none());
        s.reset_episode(AgentId(0), false);
        assert!(s.racer(AgentId(0)).is_active());
    }

    #[test]
    fn test_expired_budget_repositions() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            checkpoint_bonus_time: 0.1,
            ..Default::default()
        };
        let mut s = session(config, 1);
        s.begin().unwrap();
        let spawn = s.racer(AgentId(0)).body.position;
        let mut expired = false;
        for _ in 0..10 {
            let report = s.step(&idle(1)).unwrap();
            if report.agent(AgentId(0)).is_some_and(|a| a.event.expired) {
                expired = true;
                break;
            }
        }
        assert!(expired);
        assert!(s.racer(AgentId(0)).body.position.distance(spawn) < 1e-3);
        assert_eq!(s.racer(AgentId(0)).body.speed(), 0.0);
        assert_eq!(s.progress()[AgentId(0)].time_remaining, 0.1);
    }

    #[test]
    fn test_expired_budget_ends_training_episode() {
        let config = RaceConfig {
            checkpoint_bonus_time: 1.0,
            ..RaceConfig::training()
        };
        let mut s = session(config, 1);
        s.begin().unwrap();
        let id = AgentId(0);

        let mut ended = None;
        for _ in 0..100 {
            let report = s.step(&idle(1)).unwrap();
            if let Some(tick) = report.agent(id).filter(|a| a.reward.done) {
                ended = Some(*tick);
                break;
            }
        }
        let tick = ended.expect("episode should end once the budget runs out");
        assert!(tick.event.expired);
        assert_eq!(tick.reward.end, Some(EpisodeEnd::Timeout));
        assert!(tick.reward.reward < -0.5);
        assert!(!s.racer(id).is_active());
        assert!(s.step(&idle(1)).unwrap().agent(id).is_none());
    }

    /// Put racer `id` on its next checkpoint so the coming tick counts it.
    fn place_at_next(s: &mut RaceSession, id: AgentId) {
        let next = s.progress()[id].next_checkpoint;
        let pose = s.track().at(next).pose;
        s.racers[id.0].body.teleport(pose);
    }

    fn lap_config(mode: RaceMode) -> RaceConfig {
        RaceConfig {
            mode,
            countdown_secs: 0.0,
            num_laps: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_primary_finishing_ends_race() {
        let mut s = session(lap_config(RaceMode::Interactive), 2);
        s.begin().unwrap();
        let primary = AgentId(0);

        for crossing in 1..=8 {
            place_at_next(&mut s, primary);
            let report = s.step(&idle(2)).unwrap();
            assert!(report.agent(primary).unwrap().event.advanced, "crossing {crossing}");
            if crossing < 8 {
                assert_eq!(report.state, RaceState::Playing, "finished after {crossing} crossings");
            } else {
                assert_eq!(report.state, RaceState::Finished);
                assert_eq!(report.changes.last().map(|c| c.to), Some(RaceState::Finished));
            }
        }

        assert!(s.racers().iter().all(|r| r.frozen));
        assert_eq!(s.progress()[primary].lap, 3);
        let standings = s.standings();
        let ranks: Vec<u32> = standings.iter().map(|st| st.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(standings[0].id, primary);
        assert_eq!(standings[0].checkpoints, 8);

        let time = s.race_time();
        let bodies: Vec<Aircraft> = s.racers().iter().map(|r| r.body).collect();
        for _ in 0..20 {
            let report = s.step(&idle(2)).unwrap();
            assert!(report.agents.is_empty());
        }
        assert_eq!(s.race_time(), time);
        assert!(s.racers().iter().zip(&bodies).all(|(r, b)| r.body == *b));
    }

    #[test]
    fn test_other_racer_finishing_keeps_race_going() {
        let mut s = session(lap_config(RaceMode::Interactive), 2);
        s.begin().unwrap();
        let rival = AgentId(1);

        for _ in 0..12 {
            place_at_next(&mut s, rival);
            let report = s.step(&idle(2)).unwrap();
            assert!(report.agent(rival).unwrap().event.advanced);
            assert_eq!(report.state, RaceState::Playing);
        }
        assert_eq!(s.progress()[rival].lap, 4);
    }

    #[test]
    fn test_training_session_never_finishes() {
        let mut s = session(lap_config(RaceMode::Training), 1);
        s.begin().unwrap();
        let primary = AgentId(0);

        let mut complete = false;
        for _ in 0..8 {
            place_at_next(&mut s, primary);
            let report = s.step(&idle(1)).unwrap();
            complete |= report.agent(primary).unwrap().event.race_complete;
            assert_eq!(report.state, RaceState::Playing);
        }
        assert!(complete);
        assert!(s.racer(primary).is_active());
    }

    #[test]
    fn test_finished_race_returns_to_grid() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..Default::default()
        };
        let mut s = session(config, 2);
        s.begin().unwrap();
        s.step(&idle(2)).unwrap();
        assert!(s.return_to_grid().is_err());
        s.transition(RaceState::Finished).unwrap();
        assert!(s.racers().iter().all(|r| r.frozen));
        s.return_to_grid().unwrap();
        assert_eq!(s.state(), RaceState::Idle);
        assert_eq!(s.race_time(), 0.0);
        assert!(s.progress().iter().all(|(_, p)| p.rank == 0 && p.lap == 1));
    }

    #[test]
    fn test_standings_sorted() {
        let config = RaceConfig {
            countdown_secs: 0.0,
            ..Default::default()
        };
        let mut s = session(config, 3);
        s.begin().unwrap();
        let standings = s.standings();
        let ranks: Vec<u32> = standings.iter().map(|st| st.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(standings[0].place, "1st");
    }
}
