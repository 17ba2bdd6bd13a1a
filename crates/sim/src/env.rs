use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use skyrace_shared::*;

use crate::reward::StepReward;
use crate::sensors::Arena;
use crate::session::RaceSession;
use crate::track::CheckpointTrack;

const LEARNER: AgentId = AgentId(0);

/// Result of stepping a single env.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub obs: Observation,
    pub reward: f32,
    pub done: bool,
    pub end: Option<EpisodeEnd>,
    pub steps: u32,
}

/// Single-aircraft training environment. Each episode starts before a
/// random checkpoint and ends on collision, timeout or the step limit.
#[derive(Debug)]
pub struct TrainingEnv {
    session: RaceSession,
    seed: u64,
}

impl TrainingEnv {
    pub fn new(config: RaceConfig, track: CheckpointTrack, arena: Arena, seed: u64) -> Result<Self, RaceError> {
        let config = RaceConfig {
            mode: RaceMode::Training,
            countdown_secs: 0.0,
            ..config
        };
        let mut session = RaceSession::new(config, track, arena, &["learner".to_string()], LEARNER, seed)?;
        session.begin()?;
        Ok(Self { session, seed })
    }

    pub fn session(&self) -> &RaceSession {
        &self.session
    }

    /// Seed of the current episode stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Start a new episode. Without a seed the previous stream continues.
    pub fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(s) = seed {
            self.seed = s;
            self.session.reseed(s);
        }
        self.session.reset_episode(LEARNER, true);
        self.session.observe(LEARNER)
    }

    /// One tick with a raw `[pitch, yaw, boost]` action.
    pub fn step(&mut self, action: [f32; ACTION_SIZE]) -> Result<StepResult, RaceError> {
        self.step_input(ControlInput::from_raw(action))
    }

    pub fn step_input(&mut self, input: ControlInput) -> Result<StepResult, RaceError> {
        let report = self.session.step(&[input])?;
        let racer = self.session.racer(LEARNER);
        let reward = match report.agent(LEARNER) {
            Some(tick) => tick.reward,
            // Already finished: nothing more to earn until reset.
            None => StepReward {
                reward: 0.0,
                done: racer.shaper.end().is_some(),
                end: racer.shaper.end(),
            },
        };
        Ok(StepResult {
            obs: self.session.observe(LEARNER),
            reward: reward.reward,
            done: reward.done,
            end: reward.end,
            steps: racer.shaper.steps(),
        })
    }

    /// Run `repeat` ticks with the same action, accumulating reward.
    /// Stops early on done.
    pub fn step_repeat(&mut self, action: [f32; ACTION_SIZE], repeat: u32) -> Result<StepResult, RaceError> {
        let mut total = 0.0f32;
        let mut result = self.step(action)?;
        total += result.reward;
        for _ in 1..repeat {
            if result.done {
                break;
            }
            result = self.step(action)?;
            total += result.reward;
        }
        result.reward = total;
        Ok(result)
    }
}

/// Vectorized environment that steps every env in parallel with rayon and
/// resets finished ones automatically.
#[derive(Debug)]
pub struct BatchEnv {
    envs: Vec<TrainingEnv>,
    rng: Pcg64,
    action_repeat: u32,
}

impl BatchEnv {
    pub fn new(
        n_envs: usize,
        config: RaceConfig,
        track: &CheckpointTrack,
        arena: &Arena,
        seed: u64,
        action_repeat: u32,
    ) -> Result<Self, RaceError> {
        if n_envs == 0 {
            return Err(RaceError::NoAgents);
        }
        let mut rng = Pcg64::seed_from_u64(seed);
        let envs = (0..n_envs)
            .map(|_| TrainingEnv::new(config.clone(), track.clone(), arena.clone(), rng.gen()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            envs,
            rng,
            action_repeat: action_repeat.max(1),
        })
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn action_repeat(&self) -> u32 {
        self.action_repeat
    }

    pub fn set_action_repeat(&mut self, value: u32) {
        self.action_repeat = value.max(1);
    }

    pub fn envs(&self) -> &[TrainingEnv] {
        &self.envs
    }

    pub fn reset(&mut self) -> Vec<Observation> {
        // Seeds are drawn up front so the result does not depend on scheduling.
        let seeds: Vec<u64> = (0..self.envs.len()).map(|_| self.rng.gen()).collect();
        self.envs
            .par_iter_mut()
            .zip(seeds.into_par_iter())
            .map(|(env, seed)| env.reset(Some(seed)))
            .collect()
    }

    /// Step all envs. Finished envs are reset and their result carries the
    /// first observation of the next episode, with `done` still set.
    pub fn step(&mut self, actions: &[[f32; ACTION_SIZE]]) -> Result<Vec<StepResult>, RaceError> {
        if actions.len() != self.envs.len() {
            return Err(RaceError::InputCount {
                expected: self.envs.len(),
                got: actions.len(),
            });
        }
        let repeat = self.action_repeat;
        let mut results = self
            .envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, action)| env.step_repeat(*action, repeat))
            .collect::<Result<Vec<_>, _>>()?;

        let reset_seeds: Vec<Option<u64>> = results
            .iter()
            .map(|r| r.done.then(|| self.rng.gen()))
            .collect();

        let reset_obs: Vec<Option<Observation>> = self
            .envs
            .par_iter_mut()
            .zip(reset_seeds.into_par_iter())
            .map(|(env, seed)| seed.map(|s| env.reset(Some(s))))
            .collect();

        for (result, obs) in results.iter_mut().zip(reset_obs) {
            if let Some(obs) = obs {
                result.obs = obs;
            }
        }
        Ok(results)
    }
}
