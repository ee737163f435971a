use hifitime::Unit;
use log::debug;

use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::EphemerisSource,
    observation::Observation,
    prelude::{Constellation, Duration, Epoch, Vector3},
};

/// Satellite state at signal transmission time
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SatelliteState {
    /// ECEF position (m)
    pub position_m: Vector3<f64>,
    /// ECEF velocity (m/s)
    pub velocity_m_s: Vector3<f64>,
    /// Clock bias (s)
    pub clock_bias_s: f64,
    /// Clock drift (s/s)
    pub clock_drift_s_s: f64,
    /// Orbit and clock variance (m²)
    pub variance_m2: f64,
    /// Broadcast health flags, 0 means healthy
    pub health: u8,
}

/// Any orbit and clock provider should implement the [OrbitSource] trait
/// to contribute to the correction process.
pub trait OrbitSource {
    /// Provide the [SatelliteState] of the [Observation]'s satellite,
    /// at transmission time of a signal received at `t_rx`.
    /// Returns None when it cannot be determined (missing ephemeris,
    /// missing pseudo range..). That satellite will be excluded.
    fn state(
        &self,
        t_rx: Epoch,
        observation: &Observation,
        ephemerides: &dyn EphemerisSource,
    ) -> Option<SatelliteState>;

    /// Provide one [SatelliteState] per [Observation], in order.
    fn states(
        &self,
        t_rx: Epoch,
        observations: &[Observation],
        ephemerides: &dyn EphemerisSource,
        states: &mut Vec<Option<SatelliteState>>,
    ) {
        states.clear();
        states.extend(
            observations
                .iter()
                .map(|obs| self.state(t_rx, obs, ephemerides)),
        );
    }
}

/// [OrbitSource] that propagates broadcast [Ephemeris](crate::prelude::Ephemeris) frames.
#[derive(Debug, Copy, Clone, Default)]
pub struct BroadcastOrbits;

impl BroadcastOrbits {
    /// Finite difference interval used in velocity and drift estimation
    const DIFFERENTIATION_STEP_S: f64 = 1.0E-3;
}

impl OrbitSource for BroadcastOrbits {
    fn state(
        &self,
        t_rx: Epoch,
        observation: &Observation,
        ephemerides: &dyn EphemerisSource,
    ) -> Option<SatelliteState> {
        let sv = observation.sv;

        let pseudo_range_m = match observation.first_pseudo_range_m() {
            Some(pr) => pr,
            None => {
                debug!("{}({}) - no pseudo range", t_rx, sv);
                return None;
            },
        };

        // raw transmission time, in satellite time
        let t_tx = t_rx - Duration::from_seconds(pseudo_range_m / SPEED_OF_LIGHT_M_S);

        let eph = match ephemerides.ephemeris_data(t_tx, sv) {
            Some(eph) => eph,
            None => {
                debug!("{}({}) - no valid ephemeris", t_rx, sv);
                return None;
            },
        };

        let t_tx = t_tx - Duration::from_seconds(eph.clock_offset_s(t_tx));

        let (position_m, clock_bias_s) = eph.position_clock(t_tx)?;
        let (position_dt, clock_bias_dt) =
            eph.position_clock(t_tx + Self::DIFFERENTIATION_STEP_S * Unit::Second)?;

        let velocity_m_s = (position_dt - position_m) / Self::DIFFERENTIATION_STEP_S;
        let clock_drift_s_s = (clock_bias_dt - clock_bias_s) / Self::DIFFERENTIATION_STEP_S;

        let health = if sv.constellation == Constellation::QZSS {
            // LEX health bit is not relevant here
            eph.health & 0xFE
        } else {
            eph.health
        };

        Some(SatelliteState {
            position_m,
            velocity_m_s,
            clock_bias_s,
            clock_drift_s_s,
            variance_m2: eph.variance_m2(),
            health,
        })
    }
}
