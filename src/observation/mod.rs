//! Receiver observations
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Constellation, Epoch, SV};

mod code;
pub use code::{Code, ParsingError as CodeParsingError};

/// Number of signal slots per [Observation]
/// (three frequencies plus extended observables).
pub const MAX_SIGNAL_SLOTS: usize = 6;

/// Maximal number of [Observation]s per receiver and per epoch
pub const MAX_OBSERVATIONS: usize = 96;

/// Receiver that produced an [Observation]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Receiver {
    /// Moving receiver whose pseudo ranges get corrected
    #[default]
    Rover = 1,
    /// Fixed reference receiver
    Base = 2,
}

impl std::fmt::Display for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Rover => write!(f, "rover"),
            Self::Base => write!(f, "base"),
        }
    }
}

/// QZSS PRN offset, when the PRN is described in the 193.. range
const QZSS_PRN_OFFSET: u16 = 192;

/// Number of QZSS satellites
const QZSS_MAX_PRN: u16 = 10;

/// Deterministic satellite number, ordering constellations
/// GPS, Glonass, Galileo, QZSS, BeiDou, NavIC (then others) and PRN within.
/// QZSS PRNs are accepted in both 1..=10 and 193..=202 ranges.
pub fn sat_no(sv: SV) -> u16 {
    let prn = sv.prn as u16;
    match sv.constellation {
        Constellation::GPS => prn,
        Constellation::Glonass => 32 + prn,
        Constellation::Galileo => 59 + prn,
        Constellation::QZSS => {
            let prn = if prn > QZSS_PRN_OFFSET {
                prn - QZSS_PRN_OFFSET
            } else {
                prn
            };
            95 + prn.min(QZSS_MAX_PRN)
        },
        Constellation::BeiDou => 105 + prn,
        Constellation::IRNSS => 168 + prn,
        _ => 256 + prn,
    }
}

/// Signal observation, in a given frequency slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signal {
    /// Signal [Code]
    pub code: Code,
    /// Pseudo range (meters). None when absent or invalidated.
    pub pseudo_range_m: Option<f64>,
    /// Carrier phase (cycles)
    pub phase_cycles: Option<f64>,
    /// Doppler shift (Hz)
    pub doppler_hz: Option<f64>,
    /// SNR (dB.Hz)
    pub snr_dbhz: Option<f64>,
    /// Loss of lock indicator
    pub lli: u8,
}

impl Signal {
    /// Creates a new pseudo range [Signal]. A null raw value
    /// is the "no measurement" sentinel and is stored as absent.
    pub fn pseudo_range(code: Code, range_m: f64) -> Self {
        Self {
            code,
            pseudo_range_m: if range_m == 0.0 { None } else { Some(range_m) },
            ..Default::default()
        }
    }

    /// Copies and returns [Signal] with carrier phase (cycles)
    pub fn with_phase_cycles(&self, cycles: f64) -> Self {
        let mut s = *self;
        s.phase_cycles = Some(cycles);
        s
    }

    /// Copies and returns [Signal] with doppler shift (Hz)
    pub fn with_doppler_hz(&self, doppler: f64) -> Self {
        let mut s = *self;
        s.doppler_hz = Some(doppler);
        s
    }

    /// Copies and returns [Signal] with SNR (dB.Hz)
    pub fn with_snr_dbhz(&self, snr: f64) -> Self {
        let mut s = *self;
        s.snr_dbhz = Some(snr);
        s
    }
}

/// One measurement of one receiver, for one satellite at one epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// [SV]
    pub sv: SV,
    /// [Receiver] tag
    pub receiver: Receiver,
    /// Frequency slots
    pub slots: [Option<Signal>; MAX_SIGNAL_SLOTS],
    /// Glonass frequency channel number, as decoded.
    /// Required to encode Glonass extended satellite info.
    pub glonass_channel: Option<i8>,
}

impl Observation {
    /// Creates an [Observation] without any [Signal].
    pub fn new(epoch: Epoch, sv: SV, receiver: Receiver) -> Self {
        Self {
            epoch,
            sv,
            receiver,
            slots: [None; MAX_SIGNAL_SLOTS],
            glonass_channel: None,
        }
    }

    /// Copies and returns [Observation] with Glonass frequency channel number.
    pub fn with_glonass_channel(&self, channel: i8) -> Self {
        let mut s = self.clone();
        s.glonass_channel = Some(channel);
        s
    }

    /// Copies and returns [Observation] with [Signal] in this slot.
    /// Panics if slot is out of range.
    pub fn with_signal(&self, slot: usize, signal: Signal) -> Self {
        let mut s = self.clone();
        s.slots[slot] = Some(signal);
        s
    }

    /// Pseudo range (meters) in this slot, if any.
    pub fn pseudo_range_m(&self, slot: usize) -> Option<f64> {
        self.slots.get(slot)?.as_ref()?.pseudo_range_m
    }

    /// Signal [Code] in this slot, if any.
    pub fn code(&self, slot: usize) -> Option<Code> {
        self.slots.get(slot)?.as_ref().map(|sig| sig.code)
    }

    /// First pseudo range (meters) found, by ascending slot.
    pub fn first_pseudo_range_m(&self) -> Option<f64> {
        (0..MAX_SIGNAL_SLOTS).find_map(|slot| self.pseudo_range_m(slot))
    }

    /// True if at least one slot has a valid pseudo range.
    pub fn has_pseudo_range(&self) -> bool {
        self.first_pseudo_range_m().is_some()
    }

    /// Adds a pseudo range correction (meters) to this slot.
    pub(crate) fn correct_pseudo_range(&mut self, slot: usize, prc_m: f64) {
        if let Some(Some(signal)) = self.slots.get_mut(slot) {
            if let Some(pr) = signal.pseudo_range_m.as_mut() {
                *pr += prc_m;
            }
        }
    }

    /// Invalidates the pseudo range in this slot.
    pub(crate) fn invalidate(&mut self, slot: usize) {
        if let Some(Some(signal)) = self.slots.get_mut(slot) {
            signal.pseudo_range_m = None;
        }
    }

    /// Invalidates all pseudo ranges.
    pub(crate) fn invalidate_all(&mut self) {
        for slot in 0..MAX_SIGNAL_SLOTS {
            self.invalidate(slot);
        }
    }

    /// Iterates all [Code]s present in this [Observation].
    pub fn codes(&self) -> Box<dyn Iterator<Item = Code> + '_> {
        Box::new(self.slots.iter().flatten().map(|sig| sig.code))
    }
}

/// Ordered collection of [Observation]s sharing one nominal [Epoch],
/// for one [Receiver].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationSet {
    /// Nominal [Epoch]
    pub epoch: Epoch,
    /// [Receiver] tag
    pub receiver: Receiver,
    /// [Observation]s
    pub observations: Vec<Observation>,
}

impl ObservationSet {
    /// Creates an empty [ObservationSet].
    pub fn new(epoch: Epoch, receiver: Receiver) -> Self {
        Self {
            epoch,
            receiver,
            observations: Vec::with_capacity(MAX_OBSERVATIONS),
        }
    }

    /// Appends an [Observation], tagged with our [Receiver].
    pub fn push(&mut self, observation: Observation) {
        let mut observation = observation;
        observation.receiver = self.receiver;
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Sorts by ascending satellite number and drops duplicated satellites
    /// (first occurrence is retained).
    pub fn sort(&mut self) {
        let sorted = self
            .observations
            .drain(..)
            .unique_by(|obs| obs.sv)
            .sorted_by_key(|obs| sat_no(obs.sv))
            .collect::<Vec<_>>();
        self.observations = sorted;
    }

    /// Iterates [Observation]s of this [Constellation].
    pub fn constellation_iter(
        &self,
        constellation: Constellation,
    ) -> Box<dyn Iterator<Item = &Observation> + '_> {
        Box::new(
            self.observations
                .iter()
                .filter(move |obs| obs.sv.constellation == constellation),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn null_pseudo_range_is_absent() {
        let sig = Signal::pseudo_range(Code::new(1, 'C'), 0.0);
        assert!(sig.pseudo_range_m.is_none());
        let sig = Signal::pseudo_range(Code::new(1, 'C'), 20.0E6);
        assert_eq!(sig.pseudo_range_m, Some(20.0E6));
    }

    #[test]
    fn satellite_numbering() {
        let g32 = SV::new(Constellation::GPS, 32);
        let r01 = SV::new(Constellation::Glonass, 1);
        let e01 = SV::new(Constellation::Galileo, 1);
        let c01 = SV::new(Constellation::BeiDou, 1);
        assert!(sat_no(g32) < sat_no(r01));
        assert!(sat_no(r01) < sat_no(e01));
        assert!(sat_no(e01) < sat_no(c01));
    }

    #[test]
    fn qzss_numbering() {
        let e36 = SV::new(Constellation::Galileo, 36);
        let c01 = SV::new(Constellation::BeiDou, 1);
        let i01 = SV::new(Constellation::IRNSS, 1);

        for prn in [1, 10, 193, 202] {
            let sv = SV::new(Constellation::QZSS, prn);
            assert!(sat_no(e36) < sat_no(sv), "J{}", prn);
            assert!(sat_no(sv) < sat_no(c01), "J{}", prn);
            assert!(sat_no(sv) < sat_no(i01), "J{}", prn);
        }

        assert_eq!(
            sat_no(SV::new(Constellation::QZSS, 194)),
            sat_no(SV::new(Constellation::QZSS, 2))
        );
        assert!(sat_no(SV::new(Constellation::QZSS, 193)) < sat_no(SV::new(Constellation::QZSS, 194)));
    }

    #[test]
    fn set_sorting() {
        let t = Epoch::from_str("2023-01-01T00:00:00 GPST").unwrap();
        let mut set = ObservationSet::new(t, Receiver::Base);
        for (constellation, prn, pr) in [
            (Constellation::Galileo, 2, 1.0),
            (Constellation::GPS, 5, 2.0),
            (Constellation::GPS, 1, 3.0),
            (Constellation::GPS, 5, 4.0),
        ] {
            let sv = SV::new(constellation, prn);
            set.push(
                Observation::new(t, sv, Receiver::Rover)
                    .with_signal(0, Signal::pseudo_range(Code::new(1, 'C'), pr)),
            );
        }
        set.sort();
        let order = set.iter().map(|obs| obs.sv).collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                SV::new(Constellation::GPS, 1),
                SV::new(Constellation::GPS, 5),
                SV::new(Constellation::Galileo, 2),
            ]
        );
        // first occurrence retained, receiver tag forced
        assert_eq!(set.observations[1].pseudo_range_m(0), Some(2.0));
        assert!(set.iter().all(|obs| obs.receiver == Receiver::Base));
    }

    #[test]
    fn invalidation() {
        let t = Epoch::default();
        let mut obs = Observation::new(t, SV::default(), Receiver::Rover)
            .with_signal(0, Signal::pseudo_range(Code::new(1, 'C'), 1.0))
            .with_signal(1, Signal::pseudo_range(Code::new(2, 'W'), 2.0).with_snr_dbhz(40.0));
        obs.correct_pseudo_range(1, 0.5);
        assert_eq!(obs.pseudo_range_m(1), Some(2.5));
        obs.invalidate(0);
        assert_eq!(obs.first_pseudo_range_m(), Some(2.5));
        obs.invalidate_all();
        assert!(!obs.has_pseudo_range());
        // other observables survive
        assert_eq!(obs.slots[1].unwrap().snr_dbhz, Some(40.0));
        assert_eq!(obs.codes().count(), 2);
    }
}
