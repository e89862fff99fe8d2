//! Spatial helpers for the vehicle frame.
//!
//! World frame is Y-up with +Z as the default forward axis. Yaw rotates
//! about +Y so that +90 degrees turns +Z onto +X.

use nalgebra::{UnitQuaternion, Vector3};
use std::f64::consts::PI;

const EPSILON: f64 = 1e-9;

/// Body forward axis.
pub fn forward_axis() -> Vector3<f64> {
    Vector3::z()
}

/// Forward vector of an orientation in world coordinates.
pub fn forward(orientation: &UnitQuaternion<f64>) -> Vector3<f64> {
    orientation * forward_axis()
}

/// Orientation from Euler angles in degrees, applied Z then X then Y.
pub fn euler_deg(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y.to_radians());
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x.to_radians());
    let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z.to_radians());
    yaw * pitch * roll
}

/// Pure yaw rotation in degrees.
pub fn yaw_deg(degrees: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), degrees.to_radians())
}

/// Compass-style heading of an orientation in degrees, [0, 360).
pub fn heading_deg(orientation: &UnitQuaternion<f64>) -> f64 {
    let f = forward(orientation);
    f.x.atan2(f.z).to_degrees().rem_euclid(360.0)
}

/// Orientation whose forward axis points along `direction` with +Y up.
///
/// Returns `None` for a zero vector or one parallel to the up axis.
pub fn look_rotation(direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    let up = Vector3::y();
    if direction.norm() < EPSILON || direction.cross(&up).norm() < EPSILON {
        return None;
    }
    Some(UnitQuaternion::face_towards(direction, &up))
}

/// Like [`look_rotation`] but ignores the vertical component.
pub fn yaw_towards(direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    look_rotation(&Vector3::new(direction.x, 0.0, direction.z))
}

/// Step from `current` towards `target` by at most `max_step_deg`.
pub fn rotate_towards(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
    max_step_deg: f64,
) -> UnitQuaternion<f64> {
    let remaining = current.angle_to(target);
    let max_step = max_step_deg.max(0.0).to_radians();
    if remaining <= max_step || remaining < EPSILON {
        return *target;
    }
    let t = max_step / remaining;
    current
        .try_slerp(target, t, EPSILON)
        .unwrap_or_else(|| yaw_step(current, max_step))
}

/// Spherical interpolation by fraction `t` (clamped to [0, 1]).
pub fn slerp_towards(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
    t: f64,
) -> UnitQuaternion<f64> {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        return *target;
    }
    current
        .try_slerp(target, t, EPSILON)
        .unwrap_or_else(|| yaw_step(current, t * PI))
}

/// Angle between two vectors in degrees; 0 if either is degenerate.
pub fn angle_between_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    if a.norm() < EPSILON || b.norm() < EPSILON {
        return 0.0;
    }
    a.angle(b).to_degrees()
}

/// Half-turn fallback: the endpoints are opposite, so any great circle
/// works. Turning about +Y keeps the vehicle level.
fn yaw_step(current: &UnitQuaternion<f64>, radians: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), radians) * current
}
