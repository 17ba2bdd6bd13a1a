use skyrace_shared::*;

use crate::flight::Aircraft;
use crate::sensors::{SensorFan, SensorField};
use crate::track::Checkpoint;

/// The three sensor fans: ahead-and-up, level, ahead-and-down.
pub const SENSOR_FANS: [SensorFan<'static>; 3] = [
    SensorFan {
        angles: &SENSOR_FAN_NARROW,
        range: SENSOR_RANGE,
        start_offset: 0.0,
        end_offset: SENSOR_UPPER_OFFSET,
    },
    SensorFan {
        angles: &SENSOR_FAN_WIDE,
        range: SENSOR_RANGE,
        start_offset: 0.0,
        end_offset: 0.0,
    },
    SensorFan {
        angles: &SENSOR_FAN_NARROW,
        range: SENSOR_RANGE,
        start_offset: 0.0,
        end_offset: SENSOR_LOWER_OFFSET,
    },
];

/// Build the observation for one aircraft heading for `next`.
///
/// Layout (61 floats):
/// - `[0..3)`   velocity, aircraft frame
/// - `[3..6)`   vector to the next checkpoint, aircraft frame
/// - `[6..9)`   next checkpoint's forward axis, aircraft frame
/// - `[9..21)`  upper fan, 3 rays x 4
/// - `[21..49)` level fan, 7 rays x 4
/// - `[49..61)` lower fan, 3 rays x 4
pub fn observe(body: &Aircraft, next: &Checkpoint, field: &dyn SensorField) -> Observation {
    let pose = body.pose();
    let mut data = Vec::with_capacity(OBS_SIZE);

    data.extend_from_slice(&pose.inverse_transform_direction(body.flight.velocity).to_array());
    data.extend_from_slice(
        &pose
            .inverse_transform_direction(next.position() - body.position)
            .to_array(),
    );
    data.extend_from_slice(&pose.inverse_transform_direction(next.forward()).to_array());

    for fan in &SENSOR_FANS {
        fan.perceive(&pose, field, &mut data);
    }

    let mut obs = Observation::zeros();
    obs.data.copy_from_slice(&data);
    obs
}
