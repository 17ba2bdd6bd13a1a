use glam::Vec3;
use skyrace_shared::{Pose, SENSOR_TAGS, SENSOR_VALUES_PER_RAY};

use crate::track::CheckpointTrack;

/// What a sensor ray can recognise. The discriminant is the slot in the
/// per-ray encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTag {
    Obstacle = 0,
    Checkpoint = 1,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub tag: SurfaceTag,
    pub distance: f32,
}

/// Anything rays can be cast against.
pub trait SensorField {
    /// Nearest hit along `dir` (unit length) within `max_distance`.
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit>;
}

/// A fan of rays in the aircraft's horizontal plane, tilted by `end_offset`.
#[derive(Debug, Clone, Copy)]
pub struct SensorFan<'a> {
    /// Polar angles in degrees; 90 is straight ahead.
    pub angles: &'a [f32],
    pub range: f32,
    pub start_offset: f32,
    pub end_offset: f32,
}

impl SensorFan<'_> {
    pub fn len(&self) -> usize {
        self.angles.len() * SENSOR_VALUES_PER_RAY
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Cast the fan from `pose` and append `[obstacle, checkpoint, miss,
    /// distance/range]` per ray to `out`.
    pub fn perceive(&self, pose: &Pose, field: &dyn SensorField, out: &mut Vec<f32>) {
        let start_local = Vec3::new(0.0, self.start_offset, 0.0);
        let start = pose.transform_point(start_local);
        for &angle in self.angles {
            let rad = angle.to_radians();
            let end_local =
                Vec3::new(self.range * rad.cos(), self.end_offset, self.range * rad.sin());
            let dir = pose.transform_direction(end_local - start_local).normalize_or_zero();

            let mut values = [0.0f32; SENSOR_VALUES_PER_RAY];
            match field.raycast(start, dir, self.range) {
                Some(hit) => {
                    values[hit.tag as usize] = 1.0;
                    values[SENSOR_TAGS + 1] = hit.distance / self.range;
                }
                None => values[SENSOR_TAGS] = 1.0,
            }
            out.extend_from_slice(&values);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub tag: SurfaceTag,
}

impl Sphere {
    fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let oc = origin - self.center;
        let b = oc.dot(dir);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = -b - sq;
        let t1 = -b + sq;
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            // origin inside the sphere
            Some(0.0)
        } else {
            None
        }
    }
}

/// Static world around the track: spherical obstacles, checkpoint volumes
/// and an optional ground plane.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    spheres: Vec<Sphere>,
    ground: Option<f32>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena seeded with one sensor-visible sphere per checkpoint.
    pub fn around(track: &CheckpointTrack, checkpoint_radius: f32) -> Self {
        let mut arena = Self::new();
        for c in track.iter() {
            arena.spheres.push(Sphere {
                center: c.position(),
                radius: checkpoint_radius,
                tag: SurfaceTag::Checkpoint,
            });
        }
        arena
    }

    pub fn with_ground(mut self, height: f32) -> Self {
        self.ground = Some(height);
        self
    }

    pub fn with_obstacle(mut self, center: Vec3, radius: f32) -> Self {
        self.spheres.push(Sphere {
            center,
            radius,
            tag: SurfaceTag::Obstacle,
        });
        self
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    /// Whether a body of `radius` at `position` touches an obstacle or the
    /// ground. Checkpoint volumes are not solid.
    pub fn touches_obstacle(&self, position: Vec3, radius: f32) -> bool {
        if self.ground.is_some_and(|g| position.y - radius <= g) {
            return true;
        }
        self.spheres
            .iter()
            .filter(|s| s.tag == SurfaceTag::Obstacle)
            .any(|s| position.distance(s.center) <= s.radius + radius)
    }
}

impl SensorField for Arena {
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        let mut consider = |tag: SurfaceTag, distance: f32| {
            if distance <= max_distance && best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit { tag, distance });
            }
        };

        for s in &self.spheres {
            if let Some(t) = s.intersect(origin, dir) {
                consider(s.tag, t);
            }
        }
        if let Some(g) = self.ground {
            if dir.y < 0.0 && origin.y >= g {
                consider(SurfaceTag::Obstacle, (origin.y - g) / -dir.y);
            }
        }
        best
    }
}

/// A field with nothing in it; every ray misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySky;

impl SensorField for EmptySky {
    fn raycast(&self, _origin: Vec3, _dir: Vec3, _max_distance: f32) -> Option<RayHit> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raycast_hits_nearest() {
        let arena = Arena::new()
            .with_obstacle(Vec3::new(0.0, 0.0, 100.0), 10.0)
            .with_obstacle(Vec3::new(0.0, 0.0, 50.0), 10.0);
        let hit = arena.raycast(Vec3::ZERO, Vec3::Z, 250.0).unwrap();
        assert_eq!(hit.tag, SurfaceTag::Obstacle);
        assert!((hit.distance - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_raycast_respects_range() {
        let arena = Arena::new().with_obstacle(Vec3::new(0.0, 0.0, 300.0), 10.0);
        assert!(arena.raycast(Vec3::ZERO, Vec3::Z, 250.0).is_none());
        assert!(arena.raycast(Vec3::ZERO, -Vec3::Z, 500.0).is_none());
    }

    #[test]
    fn test_ground_is_obstacle() {
        let arena = Arena::new().with_ground(0.0);
        let hit = arena.raycast(Vec3::new(0.0, 10.0, 0.0), -Vec3::Y, 250.0).unwrap();
        assert_eq!(hit.tag, SurfaceTag::Obstacle);
        assert!((hit.distance - 10.0).abs() < 1e-4);
        assert!(arena.touches_obstacle(Vec3::new(0.0, 2.0, 0.0), 4.0));
        assert!(!arena.touches_obstacle(Vec3::new(0.0, 20.0, 0.0), 4.0));
    }

    #[test]
    fn test_checkpoints_are_not_solid() {
        let arena = Arena::new().with_obstacle(Vec3::new(50.0, 0.0, 0.0), 5.0);
        let mut arena = arena;
        arena.spheres.push(Sphere {
            center: Vec3::ZERO,
            radius: 30.0,
            tag: SurfaceTag::Checkpoint,
        });
        assert!(!arena.touches_obstacle(Vec3::ZERO, 4.0));
        assert!(arena.touches_obstacle(Vec3::new(46.0, 0.0, 0.0), 4.0));
    }

    #[test]
    fn test_fan_encoding() {
        let arena = Arena::new().with_obstacle(Vec3::new(0.0, 0.0, 100.0), 10.0);
        let fan = SensorFan {
            angles: &[90.0, 0.0],
            range: 250.0,
            start_offset: 0.0,
            end_offset: 0.0,
        };
        let mut out = Vec::new();
        fan.perceive(&Pose::default(), &arena, &mut out);
        assert_eq!(out.len(), fan.len());
        // Straight ahead hits the obstacle at 90 units.
        assert_eq!(&out[0..3], &[1.0, 0.0, 0.0]);
        assert!((out[3] - 90.0 / 250.0).abs() < 1e-4);
        // Right-hand ray misses.
        assert_eq!(&out[4..8], &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_empty_sky_misses() {
        assert!(EmptySky.raycast(Vec3::ZERO, Vec3::Z, 1e6).is_none());
    }
}
