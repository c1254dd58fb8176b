//! Per-timestamp attenuation between the ground asset and the relay constellation
//!
//! `AttenuationSampler` evaluates one instant against every relay;
//! `TrajectoryPipeline` walks a whole ground track and collects one
//! `OutputRow` per sample, in input order.

mod pipeline;
mod sampler;

pub use pipeline::*;
pub use sampler::*;

use crate::geometry::GeodeticPosition;

/// Default carrier frequency (Iridium L-band), Hz
pub const DEFAULT_FREQUENCY_HZ: f64 = 1616e6;

/// One point of the input ground track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSample {
    /// Seconds relative to the run's base epoch
    pub time_s: f64,
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub altitude_m: f64,
}

impl GroundSample {
    pub fn geodetic(&self) -> GeodeticPosition {
        GeodeticPosition {
            longitude_deg: self.longitude_deg,
            latitude_deg: self.latitude_deg,
            altitude_m: self.altitude_m,
        }
    }
}

/// Geometry and link budget of one relay at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayEvaluation {
    pub relay_id: u32,
    pub distance_m: f64,
    pub line_of_sight: bool,
    /// `None` when the Earth blocks the path
    pub path_loss_db: Option<f64>,
    /// Sub-relay point, filled in when trajectories are requested
    pub subpoint: Option<GeodeticPosition>,
}

/// The visible relay with the lowest path loss
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaySelection {
    pub relay_id: u32,
    pub distance_m: f64,
    pub path_loss_db: f64,
}

/// How much per-relay information goes into each row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDetail {
    /// Keep every relay's distance, LOS flag and path loss
    pub per_relay: bool,
    /// Also keep every relay's geodetic subpoint (implies `per_relay`)
    pub relay_subpoints: bool,
}

impl Default for RowDetail {
    fn default() -> Self {
        Self {
            per_relay: true,
            relay_subpoints: false,
        }
    }
}

impl RowDetail {
    pub fn summary_only() -> Self {
        Self {
            per_relay: false,
            relay_subpoints: false,
        }
    }

    pub fn with_subpoints() -> Self {
        Self {
            per_relay: true,
            relay_subpoints: true,
        }
    }
}

/// One row of the result table
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// Absolute time, seconds since 1970-01-01 UTC
    pub epoch_s: f64,
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub altitude_m: f64,
    /// `None` when no relay is visible
    pub selection: Option<RelaySelection>,
    /// Every relay in catalog order; empty unless per-relay detail was requested
    pub relays: Vec<RelayEvaluation>,
}

impl OutputRow {
    /// Distance to the selected relay, infinite when there is none
    pub fn min_distance_m(&self) -> f64 {
        self.selection
            .map(|s| s.distance_m)
            .unwrap_or(f64::INFINITY)
    }

    /// Path loss to the selected relay, infinite when there is none
    pub fn min_path_loss_db(&self) -> f64 {
        self.selection
            .map(|s| s.path_loss_db)
            .unwrap_or(f64::INFINITY)
    }

    pub fn selected_relay(&self) -> Option<u32> {
        self.selection.map(|s| s.relay_id)
    }
}

/// Settings for a trajectory run
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Carrier frequency, Hz
    pub frequency_hz: f64,
    /// Seconds since 1970-01-01 UTC that sample times are relative to
    pub base_epoch_s: f64,
    pub detail: RowDetail,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            base_epoch_s: 0.0,
            detail: RowDetail::default(),
        }
    }
}
