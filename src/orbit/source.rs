//! Position queries: where is a relay (or the ground asset) at a given instant

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike};
use nalgebra::Vector3;
use parking_lot::RwLock;
use satkit::sgp4::sgp4;

use super::OrbitalElements;
use crate::geometry::{geodetic_to_itrf, GeodeticPosition};

/// Entries kept in the propagation memo before it is flushed
const MEMO_CAPACITY: usize = 1 << 16;

/// Position query error types
#[derive(Debug, Clone)]
pub enum PropagationError {
    /// Seconds-since-1970 value that cannot be represented as a UTC instant
    InvalidEpoch { unix_seconds: f64 },

    /// satkit rejected the element lines
    InvalidElements { catalog_id: u32, message: String },

    /// SGP4 failed for these elements at this epoch (decayed, diverged, ...)
    Sgp4Failure { catalog_id: u32, unix_seconds: f64 },
}

impl std::fmt::Display for PropagationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEpoch { unix_seconds } => {
                write!(f, "Time {} is invalid, might be too big", unix_seconds)
            }
            Self::InvalidElements {
                catalog_id,
                message,
            } => {
                write!(f, "Satellite #{} has unusable elements: {}", catalog_id, message)
            }
            Self::Sgp4Failure {
                catalog_id,
                unix_seconds,
            } => {
                write!(
                    f,
                    "SGP4 failed for satellite #{} at t = {} s",
                    catalog_id, unix_seconds
                )
            }
        }
    }
}

impl std::error::Error for PropagationError {}

/// A UTC instant, kept both as unix seconds and as a satkit time
#[derive(Debug, Clone, Copy)]
pub struct Epoch {
    unix_seconds: f64,
    instant: satkit::Instant,
}

impl Epoch {
    /// Build an epoch from seconds since 1970-01-01T00:00:00 UTC
    pub fn from_unix(unix_seconds: f64) -> Result<Self, PropagationError> {
        let invalid = || PropagationError::InvalidEpoch { unix_seconds };
        if !unix_seconds.is_finite() {
            return Err(invalid());
        }

        let whole = unix_seconds.floor();
        if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
            return Err(invalid());
        }
        let nanos = (((unix_seconds - whole) * 1e9) as u32).min(999_999_999);
        let utc = DateTime::from_timestamp(whole as i64, nanos).ok_or_else(invalid)?;

        let instant = satkit::Instant::from_datetime(
            utc.year(),
            utc.month() as i32,
            utc.day() as i32,
            utc.hour() as i32,
            utc.minute() as i32,
            utc.second() as f64 + utc.nanosecond() as f64 * 1e-9,
        )
        .map_err(|_| invalid())?;

        Ok(Self {
            unix_seconds,
            instant,
        })
    }

    pub fn unix_seconds(&self) -> f64 {
        self.unix_seconds
    }

    pub fn instant(&self) -> &satkit::Instant {
        &self.instant
    }
}

/// Source of Earth-fixed (ITRF) positions in meters
pub trait OrbitSource {
    /// Position of a relay at `epoch`
    fn relay_position(
        &self,
        elements: &OrbitalElements,
        epoch: &Epoch,
    ) -> Result<Vector3<f64>, PropagationError>;

    /// Position of the ground asset at `epoch`
    fn ground_position(&self, ground: &GeodeticPosition, _epoch: &Epoch) -> Vector3<f64> {
        geodetic_to_itrf(ground.longitude_deg, ground.latitude_deg, ground.altitude_m)
    }
}

/// SGP4 propagation via satkit, rotated from TEME into ITRF.
///
/// Parsed TLEs and computed positions are memoized per catalog id. Passing
/// different elements for an id already seen replaces its TLE and drops its
/// memoized positions.
#[derive(Default)]
pub struct SatkitOrbitSource {
    tles: RwLock<HashMap<u32, (OrbitalElements, satkit::TLE)>>,
    memo: RwLock<HashMap<(u32, u64), Vector3<f64>>>,
}

impl SatkitOrbitSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parsed TLEs held
    pub fn tle_count(&self) -> usize {
        self.tles.read().len()
    }

    fn is_current(&self, elements: &OrbitalElements) -> bool {
        self.tles
            .read()
            .get(&elements.catalog_id())
            .is_some_and(|(cached, _)| cached == elements)
    }

    fn tle_for(&self, elements: &OrbitalElements) -> Result<satkit::TLE, PropagationError> {
        let catalog_id = elements.catalog_id();
        if let Some((cached, tle)) = self.tles.read().get(&catalog_id) {
            if cached == elements {
                return Ok(tle.clone());
            }
        }

        let tle = satkit::TLE::load_2line(elements.line1(), elements.line2()).map_err(|e| {
            log::trace!("Failed to parse TLE #{}: {}", catalog_id, e);
            PropagationError::InvalidElements {
                catalog_id,
                message: e.to_string(),
            }
        })?;

        let previous = self
            .tles
            .write()
            .insert(catalog_id, (elements.clone(), tle.clone()));
        if previous.is_some() {
            log::debug!("Elements of satellite #{} changed, dropping cached positions", catalog_id);
            self.memo.write().retain(|(id, _), _| *id != catalog_id);
        }
        Ok(tle)
    }
}

impl OrbitSource for SatkitOrbitSource {
    fn relay_position(
        &self,
        elements: &OrbitalElements,
        epoch: &Epoch,
    ) -> Result<Vector3<f64>, PropagationError> {
        let key = (elements.catalog_id(), epoch.unix_seconds().to_bits());
        if self.is_current(elements) {
            if let Some(position) = self.memo.read().get(&key) {
                return Ok(*position);
            }
        }

        let mut tle = self.tle_for(elements)?;
        let result = match sgp4(&mut tle, &[*epoch.instant()]) {
            Ok(result) => result,
            Err(_) => {
                return Err(PropagationError::Sgp4Failure {
                    catalog_id: elements.catalog_id(),
                    unix_seconds: epoch.unix_seconds(),
                })
            }
        };

        // sgp4 output is TEME, in meters
        let pos_teme = result.pos.column(0).into_owned();
        let q_teme_to_itrf = satkit::frametransform::qteme2itrf(epoch.instant());
        let pos_itrf = q_teme_to_itrf.transform_vector(&pos_teme);
        let position = Vector3::new(pos_itrf[0], pos_itrf[1], pos_itrf[2]);

        let mut memo = self.memo.write();
        if memo.len() >= MEMO_CAPACITY {
            memo.clear();
        }
        memo.insert(key, position);

        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::elements::checksum;
    use crate::orbit::elements::tests::{ISS_LINE1, ISS_LINE2};

    #[test]
    fn test_epoch_from_unix() {
        let epoch = Epoch::from_unix(1_600_000_000.5).unwrap();
        assert_eq!(epoch.unix_seconds(), 1_600_000_000.5);

        assert!(Epoch::from_unix(f64::NAN).is_err());
        assert!(Epoch::from_unix(f64::INFINITY).is_err());
        assert!(matches!(
            Epoch::from_unix(1e30),
            Err(PropagationError::InvalidEpoch { .. })
        ));
    }

    #[test]
    fn test_default_ground_position_is_geodetic() {
        struct Fixed;
        impl OrbitSource for Fixed {
            fn relay_position(
                &self,
                _elements: &OrbitalElements,
                _epoch: &Epoch,
            ) -> Result<Vector3<f64>, PropagationError> {
                Ok(Vector3::zeros())
            }
        }

        let epoch = Epoch::from_unix(1_600_000_000.0).unwrap();
        let ground = GeodeticPosition {
            longitude_deg: 90.0,
            latitude_deg: 0.0,
            altitude_m: 0.0,
        };
        let p = Fixed.ground_position(&ground, &epoch);
        assert!(p.x.abs() < 1e-3);
        assert!((p.y - 6_378_137.0).abs() < 1e-3);
    }

    #[test]
    fn test_tle_parsed_once() {
        let source = SatkitOrbitSource::new();
        let elements = OrbitalElements::parse(ISS_LINE1, ISS_LINE2).unwrap();

        source.tle_for(&elements).unwrap();
        source.tle_for(&elements).unwrap();
        assert_eq!(source.tle_count(), 1);
    }

    #[test]
    fn test_new_elements_replace_cached_ones() {
        let source = SatkitOrbitSource::new();
        let old = OrbitalElements::parse(ISS_LINE1, ISS_LINE2).unwrap();

        // Same object, later mean motion
        let mut line2 = format!("{}15.72130000{}", &ISS_LINE2[..52], &ISS_LINE2[63..68]);
        line2.push(char::from(b'0' + checksum(&line2)));
        let new = OrbitalElements::parse(ISS_LINE1, &line2).unwrap();

        source.tle_for(&old).unwrap();
        source.memo.write().insert((25544, 0), Vector3::new(1.0, 2.0, 3.0));
        source.memo.write().insert((24793, 0), Vector3::new(4.0, 5.0, 6.0));
        assert!(source.is_current(&old));
        assert!(!source.is_current(&new));

        source.tle_for(&new).unwrap();
        assert_eq!(source.tle_count(), 1);
        assert!(source.is_current(&new));
        assert!(!source.is_current(&old));

        let memo = source.memo.read();
        assert!(!memo.contains_key(&(25544, 0)));
        assert!(memo.contains_key(&(24793, 0)));
    }

    #[test]
    #[ignore = "needs satkit astronomical data files"]
    fn test_iss_position_is_low_earth_orbit() {
        let source = SatkitOrbitSource::new();
        let elements = OrbitalElements::parse(ISS_LINE1, ISS_LINE2).unwrap();
        // 2008-09-20, close to the element epoch
        let epoch = Epoch::from_unix(1_221_912_000.0).unwrap();

        let first = source.relay_position(&elements, &epoch).unwrap();
        let radius_km = first.norm() / 1000.0;
        assert!(radius_km > 6_600.0 && radius_km < 6_800.0, "r = {}", radius_km);

        let again = source.relay_position(&elements, &epoch).unwrap();
        assert_eq!(first, again);
        assert_eq!(source.tle_count(), 1);
    }
}
