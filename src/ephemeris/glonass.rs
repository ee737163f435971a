use nalgebra::{Vector3, Vector6};

use crate::{
    constants::{
        GLO_EARTH_ANGULAR_VEL_RAD, GLO_EARTH_EQUATORIAL_RADIUS_M, GLO_GRAVITATION_MU_M3_S2, GLO_J2,
    },
    ephemeris::GlonassParameters,
    prelude::Epoch,
};

/// Integration step (s)
const INTEGRATION_STEP_S: f64 = 60.0;

/// PZ-90 equations of motion, state is (position, velocity).
fn derivatives(x: &Vector6<f64>, acc: &Vector3<f64>) -> Vector6<f64> {
    let r2 = x[0] * x[0] + x[1] * x[1] + x[2] * x[2];
    if r2 <= 0.0 {
        return Vector6::zeros();
    }

    let r3 = r2 * r2.sqrt();
    let omg2 = GLO_EARTH_ANGULAR_VEL_RAD.powi(2);

    let a = 1.5 * GLO_J2 * GLO_GRAVITATION_MU_M3_S2 * GLO_EARTH_EQUATORIAL_RADIUS_M.powi(2)
        / r2
        / r3;
    let b = 5.0 * x[2] * x[2] / r2;
    let c = -GLO_GRAVITATION_MU_M3_S2 / r3 - a * (1.0 - b);

    Vector6::new(
        x[3],
        x[4],
        x[5],
        (c + omg2) * x[0] + 2.0 * GLO_EARTH_ANGULAR_VEL_RAD * x[4] + acc[0],
        (c + omg2) * x[1] - 2.0 * GLO_EARTH_ANGULAR_VEL_RAD * x[3] + acc[1],
        (c - 2.0 * a) * x[2] + acc[2],
    )
}

/// Runge Kutta (4th order) integration step.
fn rk4_step(dt: f64, x: &mut Vector6<f64>, acc: &Vector3<f64>) {
    let k1 = derivatives(x, acc);
    let k2 = derivatives(&(*x + k1 * dt / 2.0), acc);
    let k3 = derivatives(&(*x + k2 * dt / 2.0), acc);
    let k4 = derivatives(&(*x + k3 * dt), acc);
    *x += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * dt / 6.0;
}

impl GlonassParameters {
    /// Clock polynomial evaluation, iterated since `t` is expressed in satellite time.
    pub(crate) fn clock_offset_s(&self, toe: Epoch, t: Epoch) -> f64 {
        let ts = (t - toe).to_seconds();
        let mut dt = ts;
        for _ in 0..2 {
            dt = ts - (-self.taun_s + self.gamn * dt);
        }
        -self.taun_s + self.gamn * dt
    }

    /// Numerical integration of the broadcast state vector,
    /// returns ECEF position (m) and clock bias (s).
    pub(crate) fn position_clock(&self, toe: Epoch, t: Epoch) -> (Vector3<f64>, f64) {
        let mut dt = (t - toe).to_seconds();
        let clock_bias_s = -self.taun_s + self.gamn * dt;

        let (x, y, z) = self.position_m;
        let (vx, vy, vz) = self.velocity_m_s;
        let (ax, ay, az) = self.acceleration_m_s2;

        let mut state = Vector6::new(x, y, z, vx, vy, vz);
        let acc = Vector3::new(ax, ay, az);

        let mut step = if dt < 0.0 {
            -INTEGRATION_STEP_S
        } else {
            INTEGRATION_STEP_S
        };

        while dt.abs() > 1.0E-9 {
            if dt.abs() < INTEGRATION_STEP_S {
                step = dt;
            }
            rk4_step(step, &mut state, &acc);
            dt -= step;
        }

        (Vector3::new(state[0], state[1], state[2]), clock_bias_s)
    }
}
