use glam::{Mat3, Quat, Vec3};
use skyrace_shared::{Pose, RaceError};

/// A closed path that can be sampled at a fractional unit coordinate.
/// Unit `i` is the i-th control point; `u` wraps modulo `point_count`.
pub trait TrackGeometry {
    fn point_count(&self) -> usize;
    fn evaluate_position(&self, u: f32) -> Vec3;
    fn evaluate_orientation(&self, u: f32) -> Quat;

    fn evaluate_pose(&self, u: f32) -> Pose {
        Pose::new(self.evaluate_position(u), self.evaluate_orientation(u))
    }
}

/// Rotation whose +Z axis points along `forward`, keeping +Y as close to
/// world up as possible.
pub fn look_rotation(forward: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let reference = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::X
    } else {
        Vec3::Y
    };
    let right = reference.cross(forward).normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// Piecewise-linear closed path through a list of waypoints.
#[derive(Debug, Clone)]
pub struct WaypointPath {
    waypoints: Vec<Vec3>,
}

impl WaypointPath {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self { waypoints }
    }

    /// Oval circuit with `points` waypoints, gently rising and falling.
    pub fn circuit(points: usize, radius_x: f32, radius_z: f32, altitude: f32, undulation: f32) -> Self {
        let waypoints = (0..points)
            .map(|i| {
                let t = i as f32 / points as f32 * std::f32::consts::TAU;
                Vec3::new(
                    radius_x * t.cos(),
                    altitude + undulation * (2.0 * t).sin(),
                    radius_z * t.sin(),
                )
            })
            .collect();
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    fn segment(&self, u: f32) -> (usize, f32) {
        let n = self.waypoints.len() as f32;
        let u = u.rem_euclid(n);
        let i = (u.floor() as usize).min(self.waypoints.len() - 1);
        (i, u - i as f32)
    }
}

impl TrackGeometry for WaypointPath {
    fn point_count(&self) -> usize {
        self.waypoints.len()
    }

    fn evaluate_position(&self, u: f32) -> Vec3 {
        if self.waypoints.is_empty() {
            return Vec3::ZERO;
        }
        let (i, t) = self.segment(u);
        let a = self.waypoints[i];
        let b = self.waypoints[(i + 1) % self.waypoints.len()];
        a.lerp(b, t)
    }

    fn evaluate_orientation(&self, u: f32) -> Quat {
        if self.waypoints.len() < 2 {
            return Quat::IDENTITY;
        }
        let (i, _) = self.segment(u);
        let a = self.waypoints[i];
        let b = self.waypoints[(i + 1) % self.waypoints.len()];
        look_rotation(b - a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub index: usize,
    pub pose: Pose,
    pub is_finish: bool,
}

impl Checkpoint {
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    /// True when the segment `from -> to` passes through this checkpoint's
    /// gate plane (normal = checkpoint forward, crossed front-wards) within
    /// `ring_radius` of its centre.
    pub fn swept_through(&self, from: Vec3, to: Vec3, ring_radius: f32) -> bool {
        let normal = self.forward();
        let d0 = (from - self.position()).dot(normal);
        let d1 = (to - self.position()).dot(normal);
        if !(d0 < 0.0 && d1 >= 0.0) {
            return false;
        }
        let t = d0 / (d0 - d1);
        let hit = from.lerp(to, t);
        hit.distance(self.position()) <= ring_radius
    }
}

/// Ordered cyclic checkpoint list, built once from a track geometry.
#[derive(Debug, Clone)]
pub struct CheckpointTrack {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointTrack {
    pub fn from_geometry(geometry: &dyn TrackGeometry) -> Result<Self, RaceError> {
        let count = geometry.point_count();
        if count == 0 {
            return Err(RaceError::EmptyTrack);
        }
        let checkpoints = (0..count)
            .map(|i| Checkpoint {
                index: i,
                pose: geometry.evaluate_pose(i as f32),
                is_finish: i == count - 1,
            })
            .collect();
        Ok(Self { checkpoints })
    }

    pub fn count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn at(&self, index: usize) -> &Checkpoint {
        &self.checkpoints[index]
    }

    pub fn next(&self, index: usize) -> usize {
        (index + 1) % self.count()
    }

    pub fn previous(&self, index: usize) -> usize {
        (index + self.count() - 1) % self.count()
    }

    pub fn finish(&self) -> &Checkpoint {
        &self.checkpoints[self.count() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Where an aircraft heading for `next_index` (re)appears: at the
    /// previously completed checkpoint, shifted sideways by its grid slot.
    pub fn spawn_pose(&self, next_index: usize, slot: usize, slots: usize, spacing: f32) -> Pose {
        let anchor = self.at(self.previous(next_index)).pose;
        let offset = (slot as f32 - slots as f32 / 2.0) * spacing;
        Pose::new(anchor.position + anchor.right() * offset, anchor.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> WaypointPath {
        WaypointPath::new(vec![
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::new(0.0, 100.0, 200.0),
            Vec3::new(200.0, 100.0, 200.0),
            Vec3::new(200.0, 100.0, 0.0),
        ])
    }

    #[test]
    fn test_track_built_from_geometry() {
        let track = CheckpointTrack::from_geometry(&square()).unwrap();
        assert_eq!(track.count(), 4);
        assert!(track.at(3).is_finish);
        assert!(track.iter().take(3).all(|c| !c.is_finish));
        assert_eq!(track.at(1).position(), Vec3::new(0.0, 100.0, 200.0));
        for (i, c) in track.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn test_empty_geometry_is_fatal() {
        let err = CheckpointTrack::from_geometry(&WaypointPath::new(Vec::new()));
        assert!(matches!(err, Err(RaceError::EmptyTrack)));
    }

    #[test]
    fn test_next_wraps() {
        let track = CheckpointTrack::from_geometry(&square()).unwrap();
        assert_eq!(track.next(0), 1);
        assert_eq!(track.next(3), 0);
        assert_eq!(track.previous(0), 3);
    }

    #[test]
    fn test_checkpoint_faces_next_waypoint() {
        let track = CheckpointTrack::from_geometry(&square()).unwrap();
        let fwd = track.at(0).forward();
        assert!((fwd - Vec3::Z).length() < 1e-5, "got {fwd:?}");
        let fwd = track.at(1).forward();
        assert!((fwd - Vec3::X).length() < 1e-5, "got {fwd:?}");
    }

    #[test]
    fn test_evaluate_position_interpolates_and_wraps() {
        let path = square();
        let mid = path.evaluate_position(0.5);
        assert!((mid - Vec3::new(0.0, 100.0, 100.0)).length() < 1e-4);
        let wrapped = path.evaluate_position(4.0);
        assert!((wrapped - Vec3::new(0.0, 100.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_swept_through_gate() {
        let track = CheckpointTrack::from_geometry(&square()).unwrap();
        let gate = track.at(1); // at (0,100,200) facing +X
        assert!(gate.swept_through(
            Vec3::new(-1.0, 100.0, 195.0),
            Vec3::new(1.0, 100.0, 195.0),
            10.0
        ));
        // Wrong direction.
        assert!(!gate.swept_through(
            Vec3::new(1.0, 100.0, 195.0),
            Vec3::new(-1.0, 100.0, 195.0),
            10.0
        ));
        // Outside the ring.
        assert!(!gate.swept_through(
            Vec3::new(-1.0, 100.0, 150.0),
            Vec3::new(1.0, 100.0, 150.0),
            10.0
        ));
    }

    #[test]
    fn test_spawn_pose_uses_previous_checkpoint() {
        let track = CheckpointTrack::from_geometry(&square()).unwrap();
        let pose = track.spawn_pose(0, 0, 1, 10.0);
        let finish = track.finish();
        assert!((pose.forward() - finish.forward()).length() < 1e-5);
        assert!((pose.position.distance(finish.position()) - 5.0).abs() < 1e-3);

        let a = track.spawn_pose(2, 0, 2, 10.0);
        let b = track.spawn_pose(2, 1, 2, 10.0);
        assert!((a.position.distance(b.position) - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_circuit_has_requested_points() {
        let path = WaypointPath::circuit(12, 600.0, 400.0, 150.0, 30.0);
        assert_eq!(path.point_count(), 12);
        let track = CheckpointTrack::from_geometry(&path).unwrap();
        assert!(track.at(11).is_finish);
    }
}
