// Tick rate
pub const TICK_RATE: u32 = 50;
pub const DT: f32 = 1.0 / TICK_RATE as f32;

// Race
pub const NUM_LAPS: u32 = 2;
pub const CHECKPOINT_BONUS_TIME: f32 = 15.0;
pub const CHECKPOINT_RADIUS: f32 = 30.0;
pub const CHECKPOINT_TRIGGER_RADIUS: f32 = 40.0;
pub const RANK_INTERVAL_SECS: f32 = 0.5;
pub const COUNTDOWN_SECS: f32 = 3.0;
pub const SPAWN_SPACING: f32 = 10.0;

// Disabled interval after hitting an obstacle (interactive only)
pub const DISABLED_SECS: f32 = 2.0; // frozen, before reposition
pub const RECOVERY_SECS: f32 = 1.0; // frozen at the checkpoint, before thaw

// Aircraft
pub const AIRCRAFT_RADIUS: f32 = 4.0;
pub const AIRCRAFT_MASS: f32 = 1000.0;
pub const LINEAR_DRAG: f32 = 1.0;
pub const BASE_THRUST: f32 = 100_000.0;
pub const BOOST_MULTIPLIER: f32 = 2.0;
pub const PITCH_SPEED: f32 = 100.0; // deg/s at full input
pub const YAW_SPEED: f32 = 100.0;
pub const ROLL_SPEED: f32 = 100.0;
pub const MAX_PITCH_ANGLE: f32 = 45.0;
pub const MAX_ROLL_ANGLE: f32 = 45.0;
pub const RATE_CHANGE_PER_SEC: f32 = 2.0;

// Training
pub const MAX_TRAINING_STEPS: u32 = 5000;
pub const STEP_TIMEOUT: u32 = 300;
pub const CHECKPOINT_REWARD: f32 = 0.5;
pub const TIMEOUT_PENALTY: f32 = 0.5;
pub const COLLISION_PENALTY: f32 = 1.0;

// Sensors
pub const SENSOR_RANGE: f32 = 250.0;
pub const SENSOR_TAGS: usize = 2; // obstacle, checkpoint
pub const SENSOR_VALUES_PER_RAY: usize = SENSOR_TAGS + 2;
pub const SENSOR_UPPER_OFFSET: f32 = 75.0;
pub const SENSOR_LOWER_OFFSET: f32 = -75.0;
pub const SENSOR_FAN_NARROW: [f32; 3] = [60.0, 90.0, 120.0];
pub const SENSOR_FAN_WIDE: [f32; 7] = [60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0];

// Observation
pub const OBS_KINEMATIC_SIZE: usize = 9;
pub const OBS_SENSOR_SIZE: usize =
    (2 * SENSOR_FAN_NARROW.len() + SENSOR_FAN_WIDE.len()) * SENSOR_VALUES_PER_RAY;
pub const OBS_SIZE: usize = OBS_KINEMATIC_SIZE + OBS_SENSOR_SIZE; // 61
pub const ACTION_SIZE: usize = 3;

// Frame streaming
pub const FRAME_INTERVAL: u32 = 5; // every 5th tick = 10fps
