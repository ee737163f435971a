use anise::constants::SPEED_OF_LIGHT_KM_S;

/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = SPEED_OF_LIGHT_KM_S * 1000.0;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// WGS84 Earth Frame Ellipsoid semi-major axis
pub const EARTH_SEMI_MAJOR_AXIS_WGS84: f64 = 6378137.0_f64;

/// GPS (and QZSS, NavIC) gravitational constant (m^3 s-2)
pub const GPS_GRAVITATION_MU_M3_S2: f64 = 3.9860050E14;

/// Galileo gravitational constant (m^3 s-2)
pub const GAL_GRAVITATION_MU_M3_S2: f64 = 3.986004418E14;

/// BeiDou gravitational constant (m^3 s-2)
pub const BDS_GRAVITATION_MU_M3_S2: f64 = 3.986004418E14;

/// BeiDou Earth angular velocity (rad/s)
pub const BDS_EARTH_ANGULAR_VEL_RAD: f64 = 7.292115E-5;

/// PZ-90 gravitational constant (m^3 s-2)
pub const GLO_GRAVITATION_MU_M3_S2: f64 = 3.9860044E14;

/// PZ-90 Earth angular velocity (rad/s)
pub const GLO_EARTH_ANGULAR_VEL_RAD: f64 = 7.292115E-5;

/// PZ-90 Earth equatorial radius (m)
pub const GLO_EARTH_EQUATORIAL_RADIUS_M: f64 = 6378136.0;

/// PZ-90 second zonal harmonic
pub const GLO_J2: f64 = 1.0826257E-3;
