//! Line of sight and local attitude
use map_3d::{ecef2aer, ecef2geodetic, Ellipsoid};
use nalgebra::Vector3;

use crate::constants::{EARTH_ANGULAR_VEL_RAD, EARTH_SEMI_MAJOR_AXIS_WGS84, SPEED_OF_LIGHT_M_S};

/// Azimuth and elevation angles, in radians.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AzEl {
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
}

impl AzEl {
    pub fn elevation_deg(&self) -> f64 {
        self.elevation_rad.to_degrees()
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth_rad.to_degrees()
    }
}

/// Geometric range (m) between satellite and receiver, corrected for
/// the Earth rotation during signal transit (Sagnac effect),
/// and line of sight unit vector (receiver to satellite).
/// Returns None when the satellite position is not physically valid.
pub fn line_of_sight(
    sat_ecef_m: &Vector3<f64>,
    rx_ecef_m: &Vector3<f64>,
) -> Option<(f64, Vector3<f64>)> {
    if sat_ecef_m.norm() < EARTH_SEMI_MAJOR_AXIS_WGS84 {
        return None;
    }

    let los = sat_ecef_m - rx_ecef_m;
    let range = los.norm();
    if range <= 0.0 {
        return None;
    }

    let sagnac = EARTH_ANGULAR_VEL_RAD
        * (sat_ecef_m[0] * rx_ecef_m[1] - sat_ecef_m[1] * rx_ecef_m[0])
        / SPEED_OF_LIGHT_M_S;

    Some((range + sagnac, los / range))
}

/// ECEF (m) to geodetic coordinates: latitude (rad), longitude (rad),
/// altitude above WGS84 ellipsoid (m).
pub fn ecef_to_geodetic(ecef_m: &Vector3<f64>) -> (f64, f64, f64) {
    ecef2geodetic(ecef_m[0], ecef_m[1], ecef_m[2], Ellipsoid::WGS84)
}

/// Azimuth and elevation of the satellite at `sat_ecef_m`,
/// seen from the geodetic position `(lat_rad, lon_rad, alt_m)`.
pub fn azimuth_elevation(sat_ecef_m: &Vector3<f64>, geodetic: (f64, f64, f64)) -> AzEl {
    let (lat, lon, alt) = geodetic;

    if alt <= -EARTH_SEMI_MAJOR_AXIS_WGS84 {
        return AzEl {
            azimuth_rad: 0.0,
            elevation_rad: std::f64::consts::FRAC_PI_2,
        };
    }

    let (azimuth_rad, elevation_rad, _) = ecef2aer(
        sat_ecef_m[0],
        sat_ecef_m[1],
        sat_ecef_m[2],
        lat,
        lon,
        alt,
        Ellipsoid::WGS84,
    );

    AzEl {
        azimuth_rad: azimuth_rad.rem_euclid(2.0 * std::f64::consts::PI),
        elevation_rad,
    }
}
