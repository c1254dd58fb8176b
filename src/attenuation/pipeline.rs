//! Trajectory-wide evaluation

use indicatif::ProgressBar;
use nalgebra::Vector3;

use super::{AttenuationSampler, GroundSample, OutputRow, PipelineConfig, SampleError};
use crate::geometry::itrf_to_geodetic;
use crate::orbit::{Epoch, OrbitSource, PropagationError, RelayCatalog};

/// Errors that abort a trajectory run
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Epoch conversion or relay propagation failed
    Propagation {
        sample_index: usize,
        source: PropagationError,
    },

    /// Degenerate geometry at one sample
    Geometry {
        sample_index: usize,
        source: SampleError,
    },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Propagation {
                sample_index,
                source,
            } => write!(f, "trajectory sample {}: {}", sample_index, source),
            Self::Geometry {
                sample_index,
                source,
            } => write!(f, "trajectory sample {}: {}", sample_index, source),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Propagation { source, .. } => Some(source),
            Self::Geometry { source, .. } => Some(source),
        }
    }
}

/// Number of relays no farther from Earth's center than the ground asset.
///
/// The occlusion test then casts from the relay instead of the ground.
pub fn count_inverted(ground: &Vector3<f64>, relays: &[(u32, Vector3<f64>)]) -> usize {
    relays
        .iter()
        .filter(|(_, p)| ground.norm_squared() >= p.norm_squared())
        .count()
}

/// Runs the sampler over every point of a ground track
pub struct TrajectoryPipeline<'a, S: OrbitSource + ?Sized> {
    source: &'a S,
    config: PipelineConfig,
    progress: ProgressBar,
}

impl<'a, S: OrbitSource + ?Sized> TrajectoryPipeline<'a, S> {
    pub fn new(source: &'a S, config: PipelineConfig) -> Self {
        Self {
            source,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each finished sample on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// One row per sample, in sample order. Any failure aborts the whole run.
    pub fn run(
        &self,
        samples: &[GroundSample],
        relays: &RelayCatalog,
    ) -> Result<Vec<OutputRow>, PipelineError> {
        let sampler = AttenuationSampler::new(self.config.frequency_hz);
        let detail = self.config.detail;
        let mut rows = Vec::with_capacity(samples.len());
        let mut inverted = 0usize;

        log::info!(
            "Computing attenuation for {} samples against {} satellites at {} MHz",
            samples.len(),
            relays.len(),
            self.config.frequency_hz / 1e6
        );

        for (sample_index, sample) in samples.iter().enumerate() {
            let propagation = |source: PropagationError| PipelineError::Propagation {
                sample_index,
                source,
            };

            let epoch = Epoch::from_unix(self.config.base_epoch_s + sample.time_s)
                .map_err(propagation)?;
            let ground = self.source.ground_position(&sample.geodetic(), &epoch);

            let positions = relays
                .iter()
                .map(|elements| {
                    self.source
                        .relay_position(elements, &epoch)
                        .map(|position| (elements.catalog_id(), position))
                })
                .collect::<Result<Vec<(u32, Vector3<f64>)>, _>>()
                .map_err(propagation)?;

            inverted += count_inverted(&ground, &positions);

            let result = sampler
                .sample(&ground, &positions)
                .map_err(|source| PipelineError::Geometry {
                    sample_index,
                    source,
                })?;

            let relays_detail = if detail.per_relay || detail.relay_subpoints {
                let mut evaluations = result.evaluations;
                if detail.relay_subpoints {
                    for (evaluation, (_, position)) in evaluations.iter_mut().zip(&positions) {
                        evaluation.subpoint = itrf_to_geodetic(position);
                    }
                }
                evaluations
            } else {
                Vec::new()
            };

            rows.push(OutputRow {
                epoch_s: epoch.unix_seconds(),
                longitude_deg: sample.longitude_deg,
                latitude_deg: sample.latitude_deg,
                altitude_m: sample.altitude_m,
                selection: result.selection,
                relays: relays_detail,
            });
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();

        if inverted > 0 {
            log::warn!(
                "{} relay evaluations had the ground asset farther from Earth's center than the relay",
                inverted
            );
        }

        let visible = rows.iter().filter(|r| r.selection.is_some()).count();
        log::info!(
            "Computed {} rows ({} with a visible satellite)",
            rows.len(),
            visible
        );

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attenuation::RowDetail;
    use crate::geometry::{distance_for_path_loss, line_of_sight, path_loss_db};
    use crate::orbit::test_support::synthetic_elements;
    use crate::orbit::OrbitalElements;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const WGS84_A: f64 = 6_378_137.0;
    const BASE_EPOCH: f64 = 1_600_000_000.0;

    /// Fixed relay positions; records every epoch it is queried at
    struct FixedSource {
        positions: HashMap<u32, Vector3<f64>>,
        queried: RefCell<Vec<f64>>,
    }

    impl FixedSource {
        fn new(positions: &[(u32, Vector3<f64>)]) -> Self {
            Self {
                positions: positions.iter().copied().collect(),
                queried: RefCell::new(Vec::new()),
            }
        }
    }

    impl OrbitSource for FixedSource {
        fn relay_position(
            &self,
            elements: &OrbitalElements,
            epoch: &Epoch,
        ) -> Result<Vector3<f64>, PropagationError> {
            self.queried.borrow_mut().push(epoch.unix_seconds());
            self.positions
                .get(&elements.catalog_id())
                .copied()
                .ok_or(PropagationError::Sgp4Failure {
                    catalog_id: elements.catalog_id(),
                    unix_seconds: epoch.unix_seconds(),
                })
        }
    }

    /// Ground point on the equator at the prime meridian, 100 m up
    fn equator_sample(time_s: f64) -> GroundSample {
        GroundSample {
            time_s,
            longitude_deg: 0.0,
            latitude_deg: 0.0,
            altitude_m: 100.0,
        }
    }

    fn ground_itrf() -> Vector3<f64> {
        Vector3::new(WGS84_A + 100.0, 0.0, 0.0)
    }

    fn config(detail: RowDetail) -> PipelineConfig {
        PipelineConfig {
            base_epoch_s: BASE_EPOCH,
            detail,
            ..PipelineConfig::default()
        }
    }

    fn catalog(ids: &[u32]) -> RelayCatalog {
        ids.iter().map(|&id| synthetic_elements(id)).collect()
    }

    #[test]
    fn test_overhead_relay_end_to_end() {
        let relay = Vector3::new(WGS84_A + 780_000.0, 0.0, 0.0);
        let source = FixedSource::new(&[(24793, relay)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));

        let rows = pipeline
            .run(&[equator_sample(0.0)], &catalog(&[24793]))
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.epoch_s, BASE_EPOCH);
        assert_eq!(row.selected_relay(), Some(24793));
        assert!((row.min_distance_m() - 779_900.0).abs() < 1e-3);

        let expected = path_loss_db(pipeline.config().frequency_hz, row.min_distance_m());
        assert!((row.min_path_loss_db() - expected).abs() < 1e-9);
        assert_eq!(row.relays.len(), 1);
        assert!(row.relays[0].line_of_sight);
    }

    #[test]
    fn test_relay_behind_earth_end_to_end() {
        let behind = Vector3::new(-(WGS84_A + 780_000.0), 0.0, 0.0);
        let source = FixedSource::new(&[(24793, behind)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));

        let rows = pipeline
            .run(&[equator_sample(0.0)], &catalog(&[24793]))
            .unwrap();

        let row = &rows[0];
        assert_eq!(row.selection, None);
        assert_eq!(row.min_distance_m(), f64::INFINITY);
        assert!(!row.relays[0].line_of_sight);
        assert_eq!(row.relays[0].path_loss_db, None);
    }

    #[test]
    fn test_three_relays_pick_lowest_loss() {
        let frequency = PipelineConfig::default().frequency_hz;
        let far = distance_for_path_loss(frequency, 150.2);
        let near = distance_for_path_loss(frequency, 148.9);
        let g = ground_itrf();

        let source = FixedSource::new(&[
            (24793, g + Vector3::new(1.0, 0.4, 0.1).normalize() * far),
            (24794, g + Vector3::new(1.0, -0.2, 0.3).normalize() * near),
            (24795, Vector3::new(-(WGS84_A + 780_000.0), 0.0, 0.0)),
        ]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));

        let rows = pipeline
            .run(&[equator_sample(0.0)], &catalog(&[24793, 24794, 24795]))
            .unwrap();

        let row = &rows[0];
        assert_eq!(row.selected_relay(), Some(24794));
        assert!((row.min_path_loss_db() - 148.9).abs() < 1e-6);
        let ids: Vec<u32> = row.relays.iter().map(|r| r.relay_id).collect();
        assert_eq!(ids, vec![24793, 24794, 24795]);
        assert_eq!(row.relays[2].path_loss_db, None);
    }

    #[test]
    fn test_relay_below_ground_asset() {
        let relay = Vector3::new(WGS84_A + 500_000.0, 100_000.0, 0.0);
        let high = GroundSample {
            altitude_m: 900_000.0,
            ..equator_sample(0.0)
        };
        let source = FixedSource::new(&[(24793, relay)]);
        let ground = source.ground_position(&high.geodetic(), &Epoch::from_unix(BASE_EPOCH).unwrap());
        assert_eq!(count_inverted(&ground, &[(24793, relay)]), 1);
        assert_eq!(count_inverted(&ground, &[]), 0);

        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));
        let rows = pipeline.run(&[high], &catalog(&[24793])).unwrap();

        assert_eq!(rows.len(), 1);
        let evaluation = rows[0].relays[0];
        assert_eq!(evaluation.line_of_sight, line_of_sight(&relay, &ground));
        assert_eq!(evaluation.line_of_sight, line_of_sight(&ground, &relay));
        assert!(evaluation.line_of_sight);
        assert_eq!(rows[0].selected_relay(), Some(24793));
    }

    #[test]
    fn test_non_finite_ground_aborts() {
        let relay = Vector3::new(WGS84_A + 780_000.0, 0.0, 0.0);
        let source = FixedSource::new(&[(24793, relay)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));
        let bad = GroundSample {
            altitude_m: f64::NAN,
            ..equator_sample(10.0)
        };

        let err = pipeline
            .run(&[equator_sample(0.0), bad], &catalog(&[24793]))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Geometry {
                sample_index: 1,
                source: SampleError::NonFinite { relay_id: 24793 },
            }
        ));
    }

    #[test]
    fn test_empty_relay_set() {
        let source = FixedSource::new(&[]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));
        let samples: Vec<GroundSample> = (0..5).map(|i| equator_sample(i as f64 * 10.0)).collect();

        let rows = pipeline.run(&samples, &RelayCatalog::new()).unwrap();

        assert_eq!(rows.len(), 5);
        for row in &rows {
            assert_eq!(row.selection, None);
            assert_eq!(row.selected_relay(), None);
            assert_eq!(row.min_path_loss_db(), f64::INFINITY);
            assert!(row.relays.is_empty());
        }
    }

    #[test]
    fn test_rows_follow_sample_order() {
        let relay = Vector3::new(WGS84_A + 780_000.0, 0.0, 0.0);
        let source = FixedSource::new(&[(24793, relay)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::summary_only()));
        let times = [30.0, 0.0, 12.5, 7.0];
        let samples: Vec<GroundSample> = times.iter().map(|&t| equator_sample(t)).collect();

        let rows = pipeline.run(&samples, &catalog(&[24793])).unwrap();

        let epochs: Vec<f64> = rows.iter().map(|r| r.epoch_s).collect();
        let expected: Vec<f64> = times.iter().map(|t| BASE_EPOCH + t).collect();
        assert_eq!(epochs, expected);
        assert_eq!(*source.queried.borrow(), expected);
        assert!(rows.iter().all(|r| r.relays.is_empty()));
    }

    #[test]
    fn test_relay_subpoints() {
        let relay = Vector3::new(WGS84_A + 780_000.0, 0.0, 0.0);
        let source = FixedSource::new(&[(24793, relay)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::with_subpoints()));

        let rows = pipeline
            .run(&[equator_sample(0.0)], &catalog(&[24793]))
            .unwrap();

        let subpoint = rows[0].relays[0].subpoint.unwrap();
        assert!(subpoint.longitude_deg.abs() < 1e-6);
        assert!(subpoint.latitude_deg.abs() < 1e-6);
        assert!((subpoint.altitude_m - 780_000.0).abs() < 1.0);
    }

    #[test]
    fn test_propagation_failure_aborts() {
        let relay = Vector3::new(WGS84_A + 780_000.0, 0.0, 0.0);
        let source = FixedSource::new(&[(24793, relay)]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));
        let samples = [equator_sample(0.0), equator_sample(10.0)];

        let result = pipeline.run(&samples, &catalog(&[24793, 24794]));
        assert!(matches!(
            result,
            Err(PipelineError::Propagation {
                sample_index: 0,
                source: PropagationError::Sgp4Failure {
                    catalog_id: 24794,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_invalid_epoch_aborts() {
        let source = FixedSource::new(&[]);
        let pipeline = TrajectoryPipeline::new(&source, config(RowDetail::default()));
        let samples = [equator_sample(0.0), equator_sample(f64::NAN)];

        let result = pipeline.run(&samples, &RelayCatalog::new());
        assert!(matches!(
            result,
            Err(PipelineError::Propagation {
                sample_index: 1,
                source: PropagationError::InvalidEpoch { .. }
            })
        ));
    }
}
