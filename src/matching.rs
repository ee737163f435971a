//! Rover / base satellite matching
use log::debug;

use crate::{
    cfg::Config,
    geometry::AzEl,
    observation::{sat_no, ObservationSet},
    prelude::SV,
};

/// Satellite observed by both receivers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Match {
    /// [SV]
    pub sv: SV,
    /// Index in the rover set
    pub rover: usize,
    /// Index in the base set
    pub base: usize,
}

/// Matches satellites observed by both rover and base. `base_azel` provides
/// the satellite attitude at the reference station, one entry per base
/// [Observation](crate::prelude::Observation), None when undetermined.
///
/// A satellite is retained when it belongs to an enabled constellation,
/// is not excluded by the user and passes the elevation mask at the base.
/// Results are stored in ascending satellite number order,
/// in the provided buffer (previous content is dropped).
pub fn match_satellites(
    rover: &ObservationSet,
    base: &ObservationSet,
    base_azel: &[Option<AzEl>],
    cfg: &Config,
    matches: &mut Vec<Match>,
) {
    matches.clear();

    for (rover_index, observation) in rover.iter().enumerate() {
        let sv = observation.sv;

        if !cfg.is_enabled(sv.constellation) || cfg.is_excluded(sv) {
            continue;
        }

        let base_index = match base.iter().position(|base| base.sv == sv) {
            Some(index) => index,
            None => continue,
        };

        let elevation_deg = match base_azel.get(base_index).copied().flatten() {
            Some(azel) => azel.elevation_deg(),
            None => {
                debug!("{}({}) - undetermined attitude", rover.epoch, sv);
                continue;
            },
        };

        if elevation_deg < cfg.elevation_mask_deg {
            debug!(
                "{}({}) - below elevation mask ({:.2}°)",
                rover.epoch, sv, elevation_deg
            );
            continue;
        }

        if matches.iter().any(|m| m.sv == sv) {
            continue;
        }

        matches.push(Match {
            sv,
            rover: rover_index,
            base: base_index,
        });
    }

    matches.sort_by_key(|m| sat_no(m.sv));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        observation::{Code, Observation, Receiver, Signal},
        prelude::{Constellation, Epoch},
    };
    use std::str::FromStr;

    fn set(receiver: Receiver, svs: &[&str]) -> ObservationSet {
        let t = Epoch::from_str("2023-01-01T00:00:00 GPST").unwrap();
        let mut set = ObservationSet::new(t, receiver);
        for sv in svs {
            let sv = SV::from_str(sv).unwrap();
            set.push(
                Observation::new(t, sv, receiver)
                    .with_signal(0, Signal::pseudo_range(Code::new(1, 'C'), 2.0E7)),
            );
        }
        set
    }

    fn elevation(deg: f64) -> Option<AzEl> {
        Some(AzEl {
            azimuth_rad: 0.0,
            elevation_rad: deg.to_radians(),
        })
    }

    #[test]
    fn common_satellites() {
        let rover = set(Receiver::Rover, &["E02", "G05", "G01", "C10"]);
        let base = set(Receiver::Base, &["G01", "G05", "C10", "R03"]);
        let azel = [elevation(45.0), elevation(30.0), elevation(60.0), elevation(80.0)];

        let mut matches = Vec::new();
        match_satellites(&rover, &base, &azel, &Config::default(), &mut matches);

        assert_eq!(
            matches,
            vec![
                Match {
                    sv: SV::new(Constellation::GPS, 1),
                    rover: 2,
                    base: 0
                },
                Match {
                    sv: SV::new(Constellation::GPS, 5),
                    rover: 1,
                    base: 1
                },
                Match {
                    sv: SV::new(Constellation::BeiDou, 10),
                    rover: 3,
                    base: 2
                },
            ]
        );

        // identical inputs: identical outcome
        let mut again = vec![Match {
            sv: SV::default(),
            rover: 0,
            base: 0,
        }];
        match_satellites(&rover, &base, &azel, &Config::default(), &mut again);
        assert_eq!(matches, again);
    }

    #[test]
    fn selection_criteria() {
        let rover = set(Receiver::Rover, &["G01", "G05", "G07", "R03"]);
        let base = set(Receiver::Base, &["G01", "G05", "G07", "R03"]);
        let azel = [elevation(9.5), None, elevation(10.5), elevation(45.0)];

        let mut matches = Vec::new();
        match_satellites(&rover, &base, &azel, &Config::default(), &mut matches);
        let svs = matches.iter().map(|m| m.sv).collect::<Vec<_>>();
        assert_eq!(svs, vec![SV::new(Constellation::GPS, 7)]);

        let cfg = Config::default()
            .with_constellations_csv("G,R")
            .unwrap()
            .with_excluded_csv("G07")
            .unwrap();

        match_satellites(&rover, &base, &azel, &cfg, &mut matches);
        let svs = matches.iter().map(|m| m.sv).collect::<Vec<_>>();
        assert_eq!(svs, vec![SV::new(Constellation::Glonass, 3)]);
    }
}
