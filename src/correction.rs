//! Pseudo range correction
use log::{debug, trace};

use crate::{
    bias::group_delay_m,
    cfg::Config,
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::EphemerisSource,
    error::Error,
    geometry::{azimuth_elevation, ecef_to_geodetic, line_of_sight, AzEl},
    matching::{match_satellites, Match},
    observation::{ObservationSet, MAX_OBSERVATIONS, MAX_SIGNAL_SLOTS},
    orbit::{OrbitSource, SatelliteState},
    prelude::Vector3,
};

/// Scratch buffers of the correction process, allocated once
/// and reused from one epoch to the next.
#[derive(Debug, Clone)]
pub struct Workspace {
    rover_states: Vec<Option<SatelliteState>>,
    base_states: Vec<Option<SatelliteState>>,
    base_azel: Vec<Option<AzEl>>,
    matches: Vec<Match>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            rover_states: Vec::with_capacity(MAX_OBSERVATIONS),
            base_states: Vec::with_capacity(MAX_OBSERVATIONS),
            base_azel: Vec::with_capacity(MAX_OBSERVATIONS),
            matches: Vec::with_capacity(MAX_OBSERVATIONS),
        }
    }
}

impl Workspace {
    /// Maximal number of combined (rover + base) observations per epoch
    pub const CAPACITY: usize = 2 * MAX_OBSERVATIONS;

    /// [Match]es of the latest correction pass
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }
}

/// Outcome of one correction pass
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Satellites observed by both receivers
    pub matched: usize,
    /// Matched satellites rejected by the exclusion test
    pub excluded: usize,
    /// Satellites with at least one corrected pseudo range
    pub corrected: usize,
}

/// Exclusion test: satellite state is missing, unhealthy
/// or not accurate enough.
fn is_excluded(state: Option<&SatelliteState>, cfg: &Config) -> bool {
    match state {
        Some(state) => state.health != 0 || state.variance_m2 > cfg.max_ephemeris_variance_m2,
        None => true,
    }
}

/// Corrects `rover` pseudo ranges in place, using synchronous `base`
/// observations of the reference station located at `base_position_m` (ECEF).
///
/// For each satellite observed by both receivers and frequency slot,
/// the correction is the geometric range from the reference station
/// (minus satellite clock bias), minus the base pseudo range (minus group delay).
/// Rover pseudo ranges that could not be corrected are invalidated,
/// they never leak uncorrected.
pub fn correct<O: OrbitSource>(
    rover: &mut ObservationSet,
    base: &ObservationSet,
    base_position_m: &Vector3<f64>,
    orbits: &O,
    ephemerides: &dyn EphemerisSource,
    cfg: &Config,
    workspace: &mut Workspace,
) -> Result<Summary, Error> {
    if rover.is_empty() {
        return Err(Error::EmptyRoverSet);
    }
    if base.is_empty() {
        return Err(Error::EmptyBaseSet);
    }

    let total = rover.len() + base.len();
    if total > Workspace::CAPACITY {
        return Err(Error::TooManyObservations(total));
    }

    if base_position_m.norm() == 0.0 {
        return Err(Error::InvalidBasePosition);
    }

    let t = rover.epoch;

    orbits.states(
        rover.epoch,
        &rover.observations,
        ephemerides,
        &mut workspace.rover_states,
    );

    orbits.states(
        base.epoch,
        &base.observations,
        ephemerides,
        &mut workspace.base_states,
    );

    // attitude at reference station
    let base_geodetic = ecef_to_geodetic(base_position_m);

    workspace.base_azel.clear();
    workspace
        .base_azel
        .extend(workspace.base_states.iter().map(|state| {
            let state = state.as_ref()?;
            line_of_sight(&state.position_m, base_position_m)?;
            Some(azimuth_elevation(&state.position_m, base_geodetic))
        }));

    match_satellites(rover, base, &workspace.base_azel, cfg, &mut workspace.matches);

    let mut summary = Summary {
        matched: workspace.matches.len(),
        ..Default::default()
    };

    if workspace.matches.is_empty() {
        debug!("{} - no common satellites", t);
    }

    for (rover_index, observation) in rover.observations.iter_mut().enumerate() {
        let sv = observation.sv;

        let matched = match workspace.matches.iter().find(|m| m.rover == rover_index) {
            Some(matched) => matched,
            None => {
                trace!("{}({}) - not observed by base", t, sv);
                observation.invalidate_all();
                continue;
            },
        };

        let base_observation = &base.observations[matched.base];
        let base_state = workspace.base_states[matched.base].as_ref();

        if is_excluded(workspace.rover_states[rover_index].as_ref(), cfg)
            || is_excluded(base_state, cfg)
        {
            debug!("{}({}) - excluded", t, sv);
            summary.excluded += 1;
            observation.invalidate_all();
            continue;
        }

        let base_state = match base_state {
            Some(state) => state,
            None => {
                observation.invalidate_all();
                continue;
            },
        };

        let range_m = match line_of_sight(&base_state.position_m, base_position_m) {
            Some((range_m, _)) => range_m,
            None => {
                debug!("{}({}) - invalid geometry", t, sv);
                observation.invalidate_all();
                continue;
            },
        };

        let corrected_range_m = range_m - SPEED_OF_LIGHT_M_S * base_state.clock_bias_s;

        let eph = ephemerides.latest(sv);
        let mut corrected = false;

        for slot in 0..MAX_SIGNAL_SLOTS {
            if slot >= cfg.frequencies {
                observation.invalidate(slot);
                continue;
            }

            let (rover_pr, base_pr) = match (
                observation.pseudo_range_m(slot),
                base_observation.pseudo_range_m(slot),
            ) {
                (Some(rover_pr), Some(base_pr)) => (rover_pr, base_pr),
                _ => {
                    observation.invalidate(slot);
                    continue;
                },
            };

            let group_delay_m = match (eph, base_observation.code(slot)) {
                (Some(eph), Some(code)) => group_delay_m(eph, code),
                _ => 0.0,
            };

            let prc_m = corrected_range_m - (base_pr - group_delay_m);

            trace!(
                "{}({}) - slot #{} pr={:.3} prc={:.3} tgd={:.3}",
                t,
                sv,
                slot,
                rover_pr,
                prc_m,
                group_delay_m
            );

            observation.correct_pseudo_range(slot, prc_m);
            corrected = true;
        }

        if corrected {
            summary.corrected += 1;
        }
    }

    Ok(summary)
}
