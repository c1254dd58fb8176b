//! Earth occlusion test against an oblate spheroid
//!
//! The Earth is modelled as an ellipsoid centered on the ITRF origin with
//! equal equatorial semi-axes and a shorter polar semi-axis. A straight
//! path between two bodies is blocked when the ray leaving the lower body
//! toward the upper one meets the ellipsoid ahead of its origin.

use nalgebra::Vector3;

/// Equatorial semi-axis along ITRF X (meters)
pub const SEMI_AXIS_A_M: f64 = 6_371_008.7714;
/// Equatorial semi-axis along ITRF Y (meters)
pub const SEMI_AXIS_B_M: f64 = 6_371_008.7714;
/// Polar semi-axis along ITRF Z (meters)
pub const SEMI_AXIS_C_M: f64 = 6_356_752.314245;

/// Whether the forward half-line `origin + t * direction` (t > 0) hits the Earth ellipsoid.
///
/// `direction` must be a unit vector and `origin` is expected to sit on or
/// above the surface.
pub fn ray_intersects_earth(origin: &Vector3<f64>, direction: &Vector3<f64>) -> bool {
    let (a, b, c) = (SEMI_AXIS_A_M, SEMI_AXIS_B_M, SEMI_AXIS_C_M);
    let (a2, b2, c2) = (a * a, b * b, c * c);
    let (x, y, z) = (origin.x, origin.y, origin.z);
    let (u, v, w) = (direction.x, direction.y, direction.z);

    let value = -a2 * b2 * w * z - a2 * c2 * v * y - b2 * c2 * u * x;
    let radical = a2 * b2 * w * w + a2 * c2 * v * v - a2 * v * v * z * z
        + 2.0 * a2 * v * w * y * z
        - a2 * w * w * y * y
        + b2 * c2 * u * u
        - b2 * u * u * z * z
        + 2.0 * b2 * u * w * x * z
        - b2 * w * w * x * x
        - c2 * u * u * y * y
        + 2.0 * c2 * u * v * x * y
        - c2 * v * v * x * x;
    let magnitude = a2 * b2 * w * w + a2 * c2 * v * v + b2 * c2 * u * u;

    if radical < 0.0 {
        return false;
    }

    // Near root of the quadratic in t
    let t = (value - a * b * c * radical.sqrt()) / magnitude;
    t > 0.0
}

/// Whether two bodies can see each other past the Earth.
///
/// The ray is cast from whichever body is nearer the Earth's center, so the
/// result does not depend on argument order. The two positions must differ.
pub fn line_of_sight(first: &Vector3<f64>, second: &Vector3<f64>) -> bool {
    let (lower, upper) = if first.norm_squared() <= second.norm_squared() {
        (first, second)
    } else {
        (second, first)
    };

    let pointing = upper - lower;
    let norm = pointing.norm();
    assert!(
        norm > 0.0,
        "line of sight requires two distinct positions, got {:?} twice",
        lower
    );

    !ray_intersects_earth(lower, &(pointing / norm))
}
