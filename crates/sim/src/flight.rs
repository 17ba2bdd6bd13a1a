use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use skyrace_shared::{ControlInput, FlightConfig, Pose};

/// Per-aircraft control state, carried across ticks. Angles are degrees in
/// `[0, 360)`; pitch/roll represent negative angles as `360 + a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    pub velocity: Vec3,
    pub smooth_pitch: f32,
    pub smooth_yaw: f32,
    pub smooth_roll: f32,
}

impl FlightState {
    pub fn from_rotation(rotation: Quat) -> Self {
        let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
        Self {
            pitch: wrap_degrees(pitch.to_degrees()),
            yaw: wrap_degrees(yaw.to_degrees()),
            roll: wrap_degrees(roll.to_degrees()),
            ..Default::default()
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    /// Roll in `(-180, 180]`.
    pub fn signed_roll(&self) -> f32 {
        signed_degrees(self.roll)
    }

    pub fn signed_pitch(&self) -> f32 {
        signed_degrees(self.pitch)
    }

    /// Stop dead: no velocity and no residual turn rates.
    pub fn halt(&mut self) {
        self.velocity = Vec3::ZERO;
        self.smooth_pitch = 0.0;
        self.smooth_yaw = 0.0;
        self.smooth_roll = 0.0;
    }
}

/// An aircraft body: where it is plus its control state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub position: Vec3,
    pub flight: FlightState,
}

impl Aircraft {
    pub fn at(pose: Pose) -> Self {
        Self {
            position: pose.position,
            flight: FlightState::from_rotation(pose.rotation),
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.flight.rotation())
    }

    pub fn speed(&self) -> f32 {
        self.flight.velocity.length()
    }

    /// Place the aircraft at `pose`, at rest.
    pub fn teleport(&mut self, pose: Pose) {
        *self = Self::at(pose);
    }

    /// Integrate one tick of thrust, drag and motion.
    pub fn integrate(&mut self, thrust: Vec3, config: &FlightConfig, dt: f32) {
        let v = &mut self.flight.velocity;
        *v += thrust / config.mass * dt;
        *v /= 1.0 + config.drag * dt;
        self.position += *v * dt;
    }
}

/// The per-tick control law: rate-limited pitch/yaw/roll smoothing with a
/// self-levelling banked turn, plus forward thrust.
#[derive(Debug, Clone, Copy)]
pub struct FlightController {
    config: FlightConfig,
}

impl FlightController {
    pub fn new(config: FlightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// Advance `state` by one tick and return the thrust to apply, computed
    /// along the forward axis *before* this tick's rotation.
    pub fn step(&self, state: &mut FlightState, input: ControlInput, dt: f32) -> Vec3 {
        let c = &self.config;

        let boost = if input.boost { c.boost_multiplier } else { 1.0 };
        let thrust = state.forward() * c.thrust * boost;

        let pitch_target = input.pitch.signum() as f32;
        let yaw_target = input.yaw.signum() as f32;
        let roll_target = if yaw_target == 0.0 {
            // level out
            -state.signed_roll() / c.max_roll_angle
        } else {
            // bank into the turn
            -yaw_target
        };

        let max_delta = c.rate_change * dt;
        state.smooth_pitch = move_towards(state.smooth_pitch, pitch_target, max_delta);
        state.smooth_yaw = move_towards(state.smooth_yaw, yaw_target, max_delta);
        state.smooth_roll = move_towards(state.smooth_roll, roll_target, max_delta);

        state.pitch = clamp_angle(
            state.pitch + state.smooth_pitch * dt * c.pitch_speed,
            -c.max_pitch_angle,
            c.max_pitch_angle,
        );
        state.yaw = wrap_degrees(state.yaw + state.smooth_yaw * dt * c.yaw_speed);
        state.roll = clamp_angle(
            state.roll + state.smooth_roll * dt * c.roll_speed,
            -c.max_roll_angle,
            c.max_roll_angle,
        );

        thrust
    }
}

/// Move `current` towards `target` by at most `max_delta`.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Wrap into `[0, 360)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Map `[0, 360)` onto `(-180, 180]`.
pub fn signed_degrees(angle: f32) -> f32 {
    let a = wrap_degrees(angle);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

/// Clamp an angle into `[min, max]` (with `min <= 0 <= max`) without a seam
/// at 0/360. The result stays in the `[0, 360)` representation: angles past
/// 180 are on the negative side and are held at `360 + min` at the lowest.
pub fn clamp_angle(angle: f32, min: f32, max: f32) -> f32 {
    let a = wrap_degrees(angle);
    if a > 180.0 {
        a.max(360.0 + min)
    } else {
        a.min(max)
    }
}
