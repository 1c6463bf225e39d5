//! Orientation helpers.
//!
//! Orientations are `Rotation3` matrices mapping BODY -> WORLD. Angular
//! velocities live in the WORLD frame and are applied by composing an
//! incremental rotation on the left.

use na::{Rotation3, Unit, Vector3};

/// Exponential map: converts an axis-angle vector to a rotation.
///
/// Given a 3D vector v = θ * n (where n is unit axis, θ is rotation angle),
/// returns the rotation by θ radians around n.
pub fn exp_rotation(v: &Vector3<f64>) -> Rotation3<f64> {
    let theta = v.norm();
    if theta < 1e-12 {
        // No significant rotation
        Rotation3::identity()
    } else {
        Rotation3::from_axis_angle(&Unit::new_normalize(*v), theta)
    }
}

/// Advance `orientation` by `omega_w` (rad/s, world frame) over `dt_s` seconds.
pub fn rotate(orientation: &Rotation3<f64>, omega_w: &Vector3<f64>, dt_s: f64) -> Rotation3<f64> {
    let mut next = exp_rotation(&(omega_w * dt_s)) * orientation;
    // Keep the matrix orthonormal; the incremental products drift otherwise.
    next.renormalize();
    next
}

/// The rotation the body performs over `window_s` seconds at angular
/// velocity `omega_w`, expressed in the BODY frame.
pub fn turning_matrix(
    orientation: &Rotation3<f64>,
    omega_w: &Vector3<f64>,
    window_s: f64,
) -> Rotation3<f64> {
    let omega_b = orientation.inverse_transform_vector(omega_w);
    exp_rotation(&(omega_b * window_s))
}

/// Turning rates in rad/s, positive towards right, up and right respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnRates {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl TurnRates {
    /// Extract yaw, pitch and roll rates from a body-frame turning matrix
    /// that covers `window_s` seconds.
    ///
    /// The angles come from `atan2` of the turned axes, so their sign is
    /// correct in every quadrant.
    pub fn from_turning_matrix(turning: &Rotation3<f64>, window_s: f64) -> Self {
        let forward = turning * Vector3::y();
        let up = turning * Vector3::z();
        TurnRates {
            yaw: signed_angle(forward.x, forward.y) / window_s,
            pitch: signed_angle(forward.z, forward.y) / window_s,
            roll: signed_angle(up.x, up.z) / window_s,
        }
    }
}

/// Angle of the (`across`, `along`) vector away from the `along` axis.
#[inline]
fn signed_angle(across: f64, along: f64) -> f64 {
    if across == 0.0 && along == 0.0 {
        0.0
    } else {
        across.atan2(along)
    }
}

/// Build a rotation from a list of axis rotations applied in order.
pub fn from_axis_rotations(steps: &[(Unit<Vector3<f64>>, f64)]) -> Rotation3<f64> {
    steps.iter().fold(Rotation3::identity(), |acc, (axis, angle)| {
        Rotation3::from_axis_angle(axis, *angle) * acc
    })
}
