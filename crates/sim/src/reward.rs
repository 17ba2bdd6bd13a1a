use skyrace_shared::{EpisodeEnd, RaceMode, RewardConfig};

use crate::progress::ProgressEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReward {
    pub reward: f32,
    pub done: bool,
    pub end: Option<EpisodeEnd>,
}

/// Per-step training reward for one aircraft. Does nothing in interactive mode.
#[derive(Debug, Clone)]
pub struct RewardShaper {
    config: RewardConfig,
    enabled: bool,
    steps: u32,
    /// Step count past which the episode times out without a checkpoint.
    deadline: u32,
    end: Option<EpisodeEnd>,
}

impl RewardShaper {
    pub fn new(config: RewardConfig, mode: RaceMode) -> Self {
        Self {
            config,
            enabled: mode == RaceMode::Training,
            steps: 0,
            deadline: config.step_timeout,
            end: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn end(&self) -> Option<EpisodeEnd> {
        self.end
    }

    pub fn begin_episode(&mut self) {
        self.steps = 0;
        self.deadline = self.config.step_timeout;
        self.end = None;
    }

    /// Reward for a tick in which the aircraft's progress produced `event`.
    pub fn on_step(&mut self, event: &ProgressEvent) -> StepReward {
        if !self.enabled || self.end.is_some() {
            return self.settled();
        }
        self.steps += 1;

        let mut reward = -1.0 / self.config.max_steps as f32;
        if event.advanced {
            reward += self.config.checkpoint_bonus;
            self.deadline = self.steps + self.config.step_timeout;
        }

        // Running out of race-clock budget counts the same as the step deadline.
        if event.expired || self.steps > self.deadline {
            reward -= self.config.timeout_penalty;
            return self.finish(reward, EpisodeEnd::Timeout);
        }
        if self.steps >= self.config.max_steps {
            return self.finish(reward, EpisodeEnd::StepLimit);
        }
        StepReward {
            reward,
            done: false,
            end: None,
        }
    }

    /// Terminal penalty for hitting something that is not another aircraft.
    pub fn on_collision(&mut self) -> StepReward {
        if !self.enabled || self.end.is_some() {
            return self.settled();
        }
        self.finish(-self.config.collision_penalty, EpisodeEnd::Collision)
    }

    fn finish(&mut self, reward: f32, end: EpisodeEnd) -> StepReward {
        self.end = Some(end);
        StepReward {
            reward,
            done: true,
            end: Some(end),
        }
    }

    fn settled(&self) -> StepReward {
        StepReward {
            reward: 0.0,
            done: self.end.is_some(),
            end: self.end,
        }
    }
}
