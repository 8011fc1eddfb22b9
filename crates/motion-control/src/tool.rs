use crate::Pose;

/// Below this rotation magnitude the axis is numerically meaningless;
/// treat the orientation as identity instead of dividing by ~0.
const SMALL_ANGLE: f64 = 1e-6;

/// Rotation matrix from an axis-angle vector (Rodrigues' formula).
pub fn rotation_matrix(axis_angle: [f64; 3]) -> [[f64; 3]; 3] {
    let [rx, ry, rz] = axis_angle;
    let theta = (rx * rx + ry * ry + rz * rz).sqrt();

    if theta < SMALL_ANGLE {
        return [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    }

    let (ux, uy, uz) = (rx / theta, ry / theta, rz / theta);
    let c = theta.cos();
    let s = theta.sin();
    let cc = 1.0 - c;

    [
        [
            c + ux * ux * cc,
            ux * uy * cc - uz * s,
            ux * uz * cc + uy * s,
        ],
        [
            uy * ux * cc + uz * s,
            c + uy * uy * cc,
            uy * uz * cc - ux * s,
        ],
        [
            uz * ux * cc - uy * s,
            uz * uy * cc + ux * s,
            c + uz * uz * cc,
        ],
    ]
}

/// Target pose `step_mm` along the tool's Z axis, expressed in the base
/// frame. The tool-local translation `(0, 0, step)` is rotated by the
/// current orientation and added to the position; orientation is
/// unchanged.
pub fn pose_along_tool_z(current: &Pose, step_mm: f64) -> Pose {
    let step_m = step_mm / 1000.0;
    let r = rotation_matrix(current.rotation);

    // R * (0, 0, step) is just the third column scaled
    let position = [
        current.position[0] + r[0][2] * step_m,
        current.position[1] + r[1][2] * step_m,
        current.position[2] + r[2][2] * step_m,
    ];

    Pose {
        position,
        rotation: current.rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_zero_step_is_identity() {
        let pose = Pose::new([0.3, -0.2, 0.5], [0.1, 0.2, 0.3]);
        let out = pose_along_tool_z(&pose, 0.0);
        assert_eq!(out, pose);
    }

    #[test]
    fn test_zero_orientation_moves_base_z() {
        let pose = Pose::new([0.1, 0.2, 0.3], [0.0; 3]);
        let out = pose_along_tool_z(&pose, 10.0);
        assert_eq!(out.position[0], 0.1);
        assert_eq!(out.position[1], 0.2);
        assert!((out.position[2] - 0.31).abs() < 1e-12);
        assert_eq!(out.rotation, [0.0; 3]);
    }

    #[test]
    fn test_small_angle_branch() {
        // Just under the threshold: identity, not a blown-up axis
        let pose = Pose::new([0.0; 3], [5e-7, 0.0, 0.0]);
        let out = pose_along_tool_z(&pose, 1.0);
        assert!((out.position[2] - 0.001).abs() < 1e-12);
        assert_eq!(out.position[0], 0.0);
        assert_eq!(out.position[1], 0.0);
    }

    #[test]
    fn test_pi_about_x_inverts_tool_z() {
        // R_x(pi) maps tool (0,0,d) to base (0,0,-d)
        let pose = Pose::new([0.0; 3], [PI, 0.0, 0.0]);
        let out = pose_along_tool_z(&pose, 10.0);
        assert!(out.position[0].abs() < 1e-12);
        assert!(out.position[1].abs() < 1e-12);
        assert!((out.position[2] + 0.01).abs() < 1e-12);
        assert_eq!(out.rotation, [PI, 0.0, 0.0]);
    }

    #[test]
    fn test_half_pi_about_x_maps_tool_z_to_minus_y() {
        // R_x(pi/2): (0,0,d) -> (0,-d,0)
        let pose = Pose::new([0.0; 3], [PI / 2.0, 0.0, 0.0]);
        let out = pose_along_tool_z(&pose, 10.0);
        assert!(out.position[0].abs() < 1e-12);
        assert!((out.position[1] + 0.01).abs() < 1e-12);
        assert!(out.position[2].abs() < 1e-9);
    }

    #[test]
    fn test_negative_step_backs_off() {
        let pose = Pose::new([0.0, 0.0, 0.5], [0.0; 3]);
        let out = pose_along_tool_z(&pose, -1.0);
        assert!((out.position[2] - 0.499).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_matrix_orthonormal() {
        let r = rotation_matrix([0.4, -0.7, 1.1]);
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| r[k][i] * r[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-12);
            }
        }
    }
}
