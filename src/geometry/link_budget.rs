//! Free-space path loss

use std::f64::consts::PI;

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Free-space path loss in dB for a carrier frequency (Hz) over a distance (m).
///
/// Only meaningful for a strictly positive distance.
pub fn path_loss_db(frequency_hz: f64, distance_m: f64) -> f64 {
    debug_assert!(distance_m > 0.0, "path loss needs a positive distance");
    20.0 * (4.0 * PI * distance_m * frequency_hz / SPEED_OF_LIGHT).log10()
}

/// Distance (m) at which the free-space path loss reaches `loss_db`
pub fn distance_for_path_loss(frequency_hz: f64, loss_db: f64) -> f64 {
    10f64.powf(loss_db / 20.0) * SPEED_OF_LIGHT / (4.0 * PI * frequency_hz)
}
