use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use skyrace_shared::{ControlInput, Observation, OBS_KINEMATIC_SIZE, SENSOR_RANGE, SENSOR_VALUES_PER_RAY};

/// Anything that can fly an aircraft: a person at the controls or a policy.
pub trait ControlSource: Send {
    fn name(&self) -> &str;
    fn act(&mut self, obs: &Observation) -> ControlInput;
}

/// Source that never touches the controls - useful for testing.
pub struct Idle;

impl ControlSource for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn act(&mut self, _obs: &Observation) -> ControlInput {
        ControlInput::none()
    }
}

/// Human controls. The input-device layer pushes the currently held
/// controls through an [`InputSender`]; the latest value is held until
/// replaced.
pub struct ManualInput {
    rx: Receiver<ControlInput>,
    held: ControlInput,
}

#[derive(Clone)]
pub struct InputSender(Sender<ControlInput>);

impl InputSender {
    /// Returns false once the aircraft's controls have been dropped.
    pub fn send(&self, input: ControlInput) -> bool {
        self.0.send(input).is_ok()
    }
}

impl ManualInput {
    pub fn channel() -> (Self, InputSender) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                held: ControlInput::none(),
            },
            InputSender(tx),
        )
    }
}

impl ControlSource for ManualInput {
    fn name(&self) -> &str {
        "manual"
    }

    fn act(&mut self, _obs: &Observation) -> ControlInput {
        loop {
            match self.rx.try_recv() {
                Ok(input) => self.held = input,
                Err(TryRecvError::Empty) => break,
                // Device gone: release the controls.
                Err(TryRecvError::Disconnected) => {
                    self.held = ControlInput::none();
                    break;
                }
            }
        }
        self.held
    }
}

/// Scripted pilot: points the nose at the next checkpoint and boosts on the
/// straights. Pulls up when the level sensor fan sees an obstacle close ahead.
pub struct CheckpointSeeker {
    /// Half-width of the no-correction cone, degrees.
    pub deadband: f32,
    /// Boost when the checkpoint is within this many degrees of the nose.
    pub boost_cone: f32,
}

impl CheckpointSeeker {
    pub fn new() -> Self {
        Self {
            deadband: 4.0,
            boost_cone: 12.0,
        }
    }
}

impl Default for CheckpointSeeker {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the centre ray of the level fan (4th of 7, after the 3-ray upper fan).
const LEVEL_CENTRE_RAY: usize = OBS_KINEMATIC_SIZE + 3 * SENSOR_VALUES_PER_RAY + 3 * SENSOR_VALUES_PER_RAY;

impl ControlSource for CheckpointSeeker {
    fn name(&self) -> &str {
        "seeker"
    }

    fn act(&mut self, obs: &Observation) -> ControlInput {
        let target = obs.to_checkpoint();
        let horizontal = (target.x * target.x + target.z * target.z).sqrt();
        let bearing = target.x.atan2(target.z).to_degrees();
        let elevation = target.y.atan2(horizontal).to_degrees();

        let yaw = if bearing > self.deadband {
            1
        } else if bearing < -self.deadband {
            -1
        } else {
            0
        };
        // Positive pitch lowers the nose.
        let mut pitch = if elevation > self.deadband {
            -1
        } else if elevation < -self.deadband {
            1
        } else {
            0
        };

        let ray = &obs.data[LEVEL_CENTRE_RAY..LEVEL_CENTRE_RAY + SENSOR_VALUES_PER_RAY];
        let obstacle_close = ray[0] > 0.5 && ray[3] * SENSOR_RANGE < 60.0;
        if obstacle_close {
            pitch = -1;
        }

        let boost = bearing.abs() < self.boost_cone && !obstacle_close;
        ControlInput::new(pitch, yaw, boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn obs_with_target(target: Vec3) -> Observation {
        let mut obs = Observation::zeros();
        obs.data[3..6].copy_from_slice(&target.to_array());
        obs
    }

    #[test]
    fn test_idle_does_nothing() {
        assert_eq!(Idle.act(&Observation::zeros()), ControlInput::none());
    }

    #[test]
    fn test_manual_holds_latest_input() {
        let (mut manual, tx) = ManualInput::channel();
        let obs = Observation::zeros();
        assert_eq!(manual.act(&obs), ControlInput::none());

        assert!(tx.send(ControlInput::new(1, 0, false)));
        assert!(tx.send(ControlInput::new(0, -1, true)));
        assert_eq!(manual.act(&obs), ControlInput::new(0, -1, true));
        // Still held on the next tick.
        assert_eq!(manual.act(&obs), ControlInput::new(0, -1, true));

        drop(tx);
        assert_eq!(manual.act(&obs), ControlInput::none());
    }

    #[test]
    fn test_seeker_straight_ahead_boosts() {
        let action = CheckpointSeeker::new().act(&obs_with_target(Vec3::new(0.0, 0.0, 300.0)));
        assert_eq!(action, ControlInput::new(0, 0, true));
    }

    #[test]
    fn test_seeker_turns_and_climbs_towards_target() {
        let action = CheckpointSeeker::new().act(&obs_with_target(Vec3::new(200.0, 80.0, 100.0)));
        assert_eq!(action.yaw, 1);
        assert_eq!(action.pitch, -1);
        assert!(!action.boost);

        let action = CheckpointSeeker::new().act(&obs_with_target(Vec3::new(-50.0, -90.0, 100.0)));
        assert_eq!(action.yaw, -1);
        assert_eq!(action.pitch, 1);
    }

    #[test]
    fn test_seeker_pulls_up_for_obstacle() {
        let mut obs = obs_with_target(Vec3::new(0.0, 0.0, 300.0));
        obs.data[LEVEL_CENTRE_RAY] = 1.0;
        obs.data[LEVEL_CENTRE_RAY + 3] = 0.1;
        let action = CheckpointSeeker::new().act(&obs);
        assert_eq!(action.pitch, -1);
        assert!(!action.boost);
    }
}
