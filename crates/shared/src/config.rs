use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::RaceError;
use crate::types::RaceMode;

/// Tunables for the per-tick control law and body integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub thrust: f32,
    pub boost_multiplier: f32,
    pub pitch_speed: f32,
    pub yaw_speed: f32,
    pub roll_speed: f32,
    pub max_pitch_angle: f32,
    pub max_roll_angle: f32,
    /// Maximum change of a smoothed rate per second.
    pub rate_change: f32,
    pub mass: f32,
    pub drag: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            thrust: BASE_THRUST,
            boost_multiplier: BOOST_MULTIPLIER,
            pitch_speed: PITCH_SPEED,
            yaw_speed: YAW_SPEED,
            roll_speed: ROLL_SPEED,
            max_pitch_angle: MAX_PITCH_ANGLE,
            max_roll_angle: MAX_ROLL_ANGLE,
            rate_change: RATE_CHANGE_PER_SEC,
            mass: AIRCRAFT_MASS,
            drag: LINEAR_DRAG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub max_steps: u32,
    pub step_timeout: u32,
    pub checkpoint_bonus: f32,
    pub timeout_penalty: f32,
    pub collision_penalty: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_TRAINING_STEPS,
            step_timeout: STEP_TIMEOUT,
            checkpoint_bonus: CHECKPOINT_REWARD,
            timeout_penalty: TIMEOUT_PENALTY,
            collision_penalty: COLLISION_PENALTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub mode: RaceMode,
    pub num_laps: u32,
    pub checkpoint_bonus_time: f32,
    pub checkpoint_radius: f32,
    pub trigger_radius: f32,
    pub rank_interval: f32,
    pub countdown_secs: f32,
    pub disabled_secs: f32,
    pub recovery_secs: f32,
    pub spawn_spacing: f32,
    pub dt: f32,
    pub flight: FlightConfig,
    pub reward: RewardConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            mode: RaceMode::Interactive,
            num_laps: NUM_LAPS,
            checkpoint_bonus_time: CHECKPOINT_BONUS_TIME,
            checkpoint_radius: CHECKPOINT_RADIUS,
            trigger_radius: CHECKPOINT_TRIGGER_RADIUS,
            rank_interval: RANK_INTERVAL_SECS,
            countdown_secs: COUNTDOWN_SECS,
            disabled_secs: DISABLED_SECS,
            recovery_secs: RECOVERY_SECS,
            spawn_spacing: SPAWN_SPACING,
            dt: DT,
            flight: FlightConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl RaceConfig {
    /// Defaults for a training episode: no countdown, training rewards on.
    pub fn training() -> Self {
        Self {
            mode: RaceMode::Training,
            countdown_secs: 0.0,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, RaceError> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RaceError> {
        fn positive(name: &str, v: f32) -> Result<(), RaceError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(RaceError::InvalidConfig(format!("{name} must be positive, got {v}")))
            }
        }
        fn non_negative(name: &str, v: f32) -> Result<(), RaceError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(RaceError::InvalidConfig(format!("{name} must not be negative, got {v}")))
            }
        }

        if self.num_laps == 0 {
            return Err(RaceError::InvalidConfig("num_laps must be at least 1".into()));
        }
        positive("checkpoint_bonus_time", self.checkpoint_bonus_time)?;
        positive("dt", self.dt)?;
        positive("rank_interval", self.rank_interval)?;
        non_negative("checkpoint_radius", self.checkpoint_radius)?;
        non_negative("trigger_radius", self.trigger_radius)?;
        non_negative("countdown_secs", self.countdown_secs)?;
        non_negative("disabled_secs", self.disabled_secs)?;
        non_negative("recovery_secs", self.recovery_secs)?;
        non_negative("spawn_spacing", self.spawn_spacing)?;

        let f = &self.flight;
        non_negative("flight.thrust", f.thrust)?;
        positive("flight.boost_multiplier", f.boost_multiplier)?;
        positive("flight.mass", f.mass)?;
        non_negative("flight.drag", f.drag)?;
        positive("flight.rate_change", f.rate_change)?;
        if !(0.0..180.0).contains(&f.max_pitch_angle) || !(0.0..180.0).contains(&f.max_roll_angle) {
            return Err(RaceError::InvalidConfig(
                "max pitch/roll angles must lie in [0, 180)".into(),
            ));
        }

        let r = &self.reward;
        if r.max_steps == 0 || r.step_timeout == 0 {
            return Err(RaceError::InvalidConfig(
                "reward.max_steps and reward.step_timeout must be at least 1".into(),
            ));
        }
        non_negative("reward.checkpoint_bonus", r.checkpoint_bonus)?;
        non_negative("reward.timeout_penalty", r.timeout_penalty)?;
        non_negative("reward.collision_penalty", r.collision_penalty)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        RaceConfig::default().validate().unwrap();
        RaceConfig::training().validate().unwrap();
    }

    #[test]
    fn test_negative_bonus_time_rejected() {
        let config = RaceConfig {
            checkpoint_bonus_time: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_laps_rejected() {
        let config = RaceConfig {
            num_laps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RaceConfig::from_json_str(r#"{"num_laps": 3, "flight": {"thrust": 5.0}}"#)
            .expect("partial config should parse");
        assert_eq!(config.num_laps, 3);
        assert_eq!(config.flight.thrust, 5.0);
        assert_eq!(config.flight.pitch_speed, PITCH_SPEED);
        assert_eq!(config.checkpoint_bonus_time, CHECKPOINT_BONUS_TIME);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let err = RaceConfig::from_json_str(r#"{"dt": 0.0}"#);
        assert!(matches!(err, Err(RaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let err = RaceConfig::from_json_str("{\"num_laps\": ").unwrap_err();
        assert!(matches!(err, RaceError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
