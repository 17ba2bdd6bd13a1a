use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::RaceConfig;

/// Stable integer handle for a racer. Assigned in spawn order, never reused
/// within a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Express a world-space direction in this pose's local frame.
    pub fn inverse_transform_direction(&self, dir: Vec3) -> Vec3 {
        self.rotation.inverse() * dir
    }

    pub fn transform_direction(&self, dir: Vec3) -> Vec3 {
        self.rotation * dir
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// One tick of control for one aircraft. Pitch and yaw are -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlInput {
    pub pitch: i8,
    pub yaw: i8,
    pub boost: bool,
}

impl ControlInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(pitch: i8, yaw: i8, boost: bool) -> Self {
        Self {
            pitch: pitch.signum(),
            yaw: yaw.signum(),
            boost,
        }
    }

    /// Decode the discrete branch encoding used by the policy runtime:
    /// pitch/yaw branches are 0 = none, 1 = positive, 2 = negative; boost is 0/1.
    pub fn from_branches(branches: [u8; 3]) -> Self {
        let axis = |b: u8| match b {
            1 => 1,
            2 => -1,
            _ => 0,
        };
        Self {
            pitch: axis(branches[0]),
            yaw: axis(branches[1]),
            boost: branches[2] == 1,
        }
    }

    pub fn to_branches(&self) -> [u8; 3] {
        let branch = |v: i8| match v {
            1 => 1,
            -1 => 2,
            _ => 0,
        };
        [branch(self.pitch), branch(self.yaw), self.boost as u8]
    }

    /// Round continuous actions onto the discrete control set.
    pub fn from_raw(raw: [f32; 3]) -> Self {
        let axis = |v: f32| v.clamp(-1.0, 1.0).round() as i8;
        Self {
            pitch: axis(raw[0]),
            yaw: axis(raw[1]),
            boost: raw[2] >= 0.5,
        }
    }

    pub fn to_raw(&self) -> [f32; 3] {
        [
            self.pitch as f32,
            self.yaw as f32,
            if self.boost { 1.0 } else { 0.0 },
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub data: [f32; crate::OBS_SIZE],
}

impl Observation {
    pub fn zeros() -> Self {
        Self {
            data: [0.0; crate::OBS_SIZE],
        }
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_slice(&self.data[0..3])
    }

    pub fn to_checkpoint(&self) -> Vec3 {
        Vec3::from_slice(&self.data[3..6])
    }

    pub fn checkpoint_forward(&self) -> Vec3 {
        Vec3::from_slice(&self.data[6..9])
    }

    pub fn sensors(&self) -> &[f32] {
        &self.data[crate::OBS_KINEMATIC_SIZE..]
    }
}

impl serde::Serialize for Observation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.as_slice().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Observation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v: Vec<f32> = Vec::deserialize(deserializer)?;
        if v.len() != crate::OBS_SIZE {
            return Err(serde::de::Error::custom(format!(
                "expected {} floats, got {}",
                crate::OBS_SIZE,
                v.len()
            )));
        }
        let mut data = [0.0f32; crate::OBS_SIZE];
        data.copy_from_slice(&v);
        Ok(Observation { data })
    }
}

/// Race lifecycle. Transitions are owned by the race context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RaceState {
    #[default]
    Idle,
    Countdown,
    Playing,
    Paused,
    Finished,
}

impl RaceState {
    pub fn can_transition_to(self, to: RaceState) -> bool {
        use RaceState::*;
        matches!(
            (self, to),
            (Idle, Countdown)
                | (Countdown, Playing)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, Finished)
                | (Paused, Finished)
                | (Finished, Idle)
        )
    }
}

/// Whether the race is driving a training episode or an interactive race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RaceMode {
    Training,
    #[default]
    Interactive,
}

/// What an aircraft touched. Contacts with other aircraft are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Agent,
    Obstacle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeEnd {
    StepLimit,
    Timeout,
    Collision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceFrame {
    pub tick: u32,
    pub race_time: f32,
    pub state: RaceState,
    pub agents: Vec<AgentSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    pub speed: f32,
    pub next_checkpoint: usize,
    pub lap: u32,
    pub rank: u32,
    pub time_remaining: f32,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub id: AgentId,
    pub name: String,
    pub rank: u32,
    pub place: String,
    pub lap: u32,
    pub checkpoints: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    pub finished: bool,
    pub final_tick: u32,
    pub race_time: f32,
    pub primary: AgentId,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceReplay {
    pub config: RaceConfig,
    pub checkpoints: Vec<[f32; 3]>,
    pub frames: Vec<RaceFrame>,
    pub result: RaceResult,
}
