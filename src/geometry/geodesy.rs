//! Geodetic <-> ITRF conversion using satkit's WGS-84 model

use nalgebra::Vector3;
use satkit::itrfcoord::ITRFCoord;

/// Geodetic position (degrees, meters above the WGS-84 ellipsoid)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPosition {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub altitude_m: f64,
}

/// Convert a geodetic position to Earth-fixed Cartesian coordinates (meters)
pub fn geodetic_to_itrf(longitude_deg: f64, latitude_deg: f64, altitude_m: f64) -> Vector3<f64> {
    let coord = ITRFCoord::from_geodetic_deg(latitude_deg, longitude_deg, altitude_m);
    Vector3::new(coord.itrf[0], coord.itrf[1], coord.itrf[2])
}

/// Convert an Earth-fixed Cartesian position (meters) to geodetic coordinates.
///
/// Longitude is wrapped into [-180, 180].
pub fn itrf_to_geodetic(position: &Vector3<f64>) -> Option<GeodeticPosition> {
    let coord = ITRFCoord::from_slice(&[position.x, position.y, position.z]).ok()?;

    let mut lon = coord.longitude_deg();
    if lon > 180.0 {
        lon -= 360.0;
    } else if lon < -180.0 {
        lon += 360.0;
    }

    Some(GeodeticPosition {
        longitude_deg: lon,
        latitude_deg: coord.latitude_deg(),
        altitude_m: coord.hae(),
    })
}
