use log::error;
use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::{
    constants::{
        BDS_EARTH_ANGULAR_VEL_RAD, BDS_GRAVITATION_MU_M3_S2, EARTH_ANGULAR_VEL_RAD,
        GAL_GRAVITATION_MU_M3_S2, GPS_GRAVITATION_MU_M3_S2, SPEED_OF_LIGHT_M_S,
    },
    ephemeris::{Ephemeris, KeplerParameters},
    prelude::{Constellation, Epoch, SV},
};

/// BeiDou GEO orbital plane inclination with respect to the ECEF frame
const BDS_GEO_INCLINATION_RAD: f64 = -5.0 * std::f64::consts::PI / 180.0;

/// True for BeiDou geostationary vehicles
fn is_beidou_geo(sv: SV) -> bool {
    sv.constellation == Constellation::BeiDou && (sv.prn <= 5 || sv.prn >= 59)
}

impl KeplerParameters {
    /// Clock polynomial evaluation, iterated since `t` is expressed in satellite time.
    pub(crate) fn clock_offset_s(&self, toc: Epoch, t: Epoch) -> f64 {
        let (af0, af1, af2) = self.af;
        let ts = (t - toc).to_seconds();
        let mut dt = ts;
        for _ in 0..2 {
            dt = ts - (af0 + af1 * dt + af2 * dt * dt);
        }
        af0 + af1 * dt + af2 * dt * dt
    }

    /// Resolves Kepler equations, returns ECEF position (m) and clock bias (s)
    /// including the relativistic correction.
    pub(crate) fn position_clock(
        &self,
        eph: &Ephemeris,
        t: Epoch,
    ) -> Option<(Vector3<f64>, f64)> {
        const MAX_ITER: usize = 30;
        const TOLERANCE: f64 = 1.0E-13;

        let (gm_m3_s2, omega_earth) = match eph.sv.constellation {
            Constellation::Galileo => (GAL_GRAVITATION_MU_M3_S2, EARTH_ANGULAR_VEL_RAD),
            Constellation::BeiDou => (BDS_GRAVITATION_MU_M3_S2, BDS_EARTH_ANGULAR_VEL_RAD),
            _ => (GPS_GRAVITATION_MU_M3_S2, EARTH_ANGULAR_VEL_RAD),
        };

        let e = self.eccentricity;
        let a = self.semi_major_axis_m;
        if a <= 0.0 {
            error!("{}({}) - invalid semi major axis", t, eph.sv);
            return None;
        }

        let (cus, cuc) = self.cus_cuc_rad;
        let (cis, cic) = self.cis_cic_rad;
        let (crs, crc) = self.crs_crc_m;

        let t_k = (t - eph.toe).to_seconds();

        let n = (gm_m3_s2 / a.powi(3)).sqrt() + self.dn_rad;
        let m = self.m0_rad + n * t_k;

        let mut e_k = m;
        let mut converged = false;
        for _ in 0..MAX_ITER {
            let e_k_lst = e_k;
            e_k -= (e_k - e * e_k.sin() - m) / (1.0 - e * e_k.cos());
            if (e_k - e_k_lst).abs() < TOLERANCE {
                converged = true;
                break;
            }
        }

        if !converged {
            error!("{}({}) - kepler solver in failure", t, eph.sv);
            return None;
        }

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let phi = ((1.0 - e * e).sqrt() * sin_e_k).atan2(cos_e_k - e) + self.omega_rad;
        let (sin_2phi, cos_2phi) = (2.0 * phi).sin_cos();

        let u_k = phi + cus * sin_2phi + cuc * cos_2phi;
        let r_k = a * (1.0 - e * cos_e_k) + crs * sin_2phi + crc * cos_2phi;
        let i_k = self.i0_rad + self.idot_rad_s * t_k + cis * sin_2phi + cic * cos_2phi;

        let orbital_plane = Vector3::new(r_k * u_k.cos(), r_k * u_k.sin(), 0.0);
        let rot_x3 = Rotation3::from_axis_angle(&Vector3::x_axis(), i_k);

        let position = if is_beidou_geo(eph.sv) {
            let omega_k = self.omega0_rad + self.omega_dot_rad_s * t_k - omega_earth * self.toe_s;
            let rot_z3 = Rotation3::from_axis_angle(&Vector3::z_axis(), omega_k);
            let inertial = rot_z3 * rot_x3 * orbital_plane;

            let (sin_5, cos_5) = BDS_GEO_INCLINATION_RAD.sin_cos();
            let (sin_w, cos_w) = (omega_earth * t_k).sin_cos();
            let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cos_5, sin_5, 0.0, -sin_5, cos_5);
            let rz = Matrix3::new(cos_w, sin_w, 0.0, -sin_w, cos_w, 0.0, 0.0, 0.0, 1.0);
            rz * rx * inertial
        } else {
            let omega_k = self.omega0_rad + (self.omega_dot_rad_s - omega_earth) * t_k
                - omega_earth * self.toe_s;
            let rot_z3 = Rotation3::from_axis_angle(&Vector3::z_axis(), omega_k);
            rot_z3 * rot_x3 * orbital_plane
        };

        let (af0, af1, af2) = self.af;
        let t_c = (t - eph.toc).to_seconds();
        let relativistic = 2.0 * (gm_m3_s2 * a).sqrt() * e * sin_e_k / SPEED_OF_LIGHT_M_S.powi(2);
        let clock_bias_s = af0 + af1 * t_c + af2 * t_c * t_c - relativistic;

        Some((position, clock_bias_s))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        ephemeris::{Ephemeris, KeplerParameters, OrbitParameters},
        prelude::{Constellation, Epoch, SV},
    };
    use std::str::FromStr;

    fn circular_orbit(constellation: Constellation, prn: u8) -> Ephemeris {
        let toe = Epoch::from_str("2023-01-01T00:00:00 GPST").unwrap();
        Ephemeris {
            sv: SV::new(constellation, prn),
            toe,
            toc: toe,
            parameters: OrbitParameters::Kepler(KeplerParameters {
                semi_major_axis_m: 26_560_000.0,
                i0_rad: 55.0_f64.to_radians(),
                af: (1.0E-4, 1.0E-11, 0.0),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn orbit_radius() {
        for (constellation, prn) in [
            (Constellation::GPS, 1),
            (Constellation::Galileo, 2),
            (Constellation::BeiDou, 1),
            (Constellation::BeiDou, 30),
        ] {
            let eph = circular_orbit(constellation, prn);
            for dt_s in [0.0, 900.0, 3600.0] {
                let t = eph.toe + hifitime::Duration::from_seconds(dt_s);
                let (position, clock_bias_s) = eph.position_clock(t).unwrap();
                assert!(
                    (position.norm() - 26_560_000.0).abs() < 1.0E-3,
                    "{}: |r|={}",
                    eph.sv,
                    position.norm()
                );
                // circular orbit: no relativistic term
                let expected = 1.0E-4 + 1.0E-11 * dt_s;
                assert!((clock_bias_s - expected).abs() < 1.0E-15);
            }
        }
    }

    #[test]
    fn clock_offset_iteration() {
        let eph = circular_orbit(Constellation::GPS, 1);
        let t = eph.toc + hifitime::Duration::from_seconds(100.0);
        let dt = eph.clock_offset_s(t);
        // t - dt, evaluated in sv time
        let expected = 1.0E-4 + 1.0E-11 * (100.0 - dt);
        assert!((dt - expected).abs() < 1.0E-18);
    }
}
