//! `trajectory`: attenuation along a ground track

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use super::{ensure_writable, progress_bar};
use crate::attenuation::{PipelineConfig, RowDetail, TrajectoryPipeline, DEFAULT_FREQUENCY_HZ};
use crate::data::{load_relay_catalog, load_trajectory, save_output};
use crate::orbit::SatkitOrbitSource;

#[derive(Args, Debug, Clone)]
pub struct TrajectoryArgs {
    /// CSV file with `altitude`, `longitude`, `latitude` and `time` columns
    #[arg(long)]
    pub trajectory: PathBuf,
    /// TLE table produced by `download`
    #[arg(long, default_value = ".tle_sat")]
    pub tle: PathBuf,
    /// Output CSV path
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,
    /// Carrier frequency in Hz
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_HZ)]
    pub frequency: f64,
    /// Unix time (s) of trajectory time 0, defaults to now
    #[arg(long)]
    pub time: Option<f64>,
    /// Also write every satellite's longitude, latitude and altitude
    #[arg(long, conflicts_with = "summary_only")]
    pub write_trajectories: bool,
    /// Only write the best satellite per sample
    #[arg(long)]
    pub summary_only: bool,
    /// Overwrite the output without asking
    #[arg(long)]
    pub noconfirm: bool,
}

impl TrajectoryArgs {
    fn detail(&self) -> RowDetail {
        if self.summary_only {
            RowDetail::summary_only()
        } else if self.write_trajectories {
            RowDetail::with_subpoints()
        } else {
            RowDetail::default()
        }
    }

    fn base_epoch_s(&self) -> f64 {
        self.time
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
    }
}

pub fn run_trajectory(args: TrajectoryArgs) -> Result<()> {
    if !args.frequency.is_finite() || args.frequency <= 0.0 {
        bail!("frequency must be > 0");
    }
    ensure_writable(&args.output, args.noconfirm)?;

    let relays = load_relay_catalog(&args.tle)?;
    let samples = load_trajectory(&args.trajectory)?;

    let config = PipelineConfig {
        frequency_hz: args.frequency,
        base_epoch_s: args.base_epoch_s(),
        detail: args.detail(),
    };
    log::info!("Trajectory time 0 is unix time {}", config.base_epoch_s);

    let source = SatkitOrbitSource::new();
    let rows = TrajectoryPipeline::new(&source, config)
        .with_progress(progress_bar(samples.len() as u64))
        .run(&samples, &relays)
        .context("Attenuation computation failed")?;

    save_output(&args.output, &rows, &relays.ids(), config.detail)
}
