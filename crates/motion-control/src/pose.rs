use serde::{Deserialize, Serialize};

/// Tool pose in the fixed base frame: Cartesian position in meters plus
/// axis-angle orientation in radians. Passed by value everywhere; no
/// component owns a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// `[x, y, z]` in meters.
    pub position: [f64; 3],
    /// `[rx, ry, rz]` axis-angle: direction = axis, magnitude = angle.
    pub rotation: [f64; 3],
}

impl Pose {
    pub fn new(position: [f64; 3], rotation: [f64; 3]) -> Self {
        Self { position, rotation }
    }

    /// Straight-line distance between the two positions, in meters.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        let dz = self.position[2] - other.position[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Same position, replacement orientation.
    pub fn with_rotation(&self, rotation: [f64; 3]) -> Self {
        Self {
            position: self.position,
            rotation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Pose::new([0.0, 0.0, 0.0], [0.0; 3]);
        let b = Pose::new([3.0, 4.0, 0.0], [0.0; 3]);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_with_rotation_keeps_position() {
        let a = Pose::new([0.1, 0.2, 0.3], [0.0; 3]);
        let b = a.with_rotation([1.0, 2.0, 3.0]);
        assert_eq!(b.position, [0.1, 0.2, 0.3]);
        assert_eq!(b.rotation, [1.0, 2.0, 3.0]);
    }
}
