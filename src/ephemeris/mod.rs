//! Broadcast ephemeris
use std::collections::HashMap;

use hifitime::Unit;
use log::debug;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Constellation, Duration, Epoch, SV};

mod glonass;
mod kepler;

/// Some constellations broadcast several parameter sets concurrently.
/// [EphemerisSet] selects one of them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EphemerisSet {
    /// Default parameter set (Galileo I/NAV, BeiDou D1/D2, legacy navigation messages)
    #[default]
    Primary,
    /// Secondary parameter set (Galileo F/NAV)
    Secondary,
}

/// Keplerian orbit and clock parameters
/// (GPS, QZSS, Galileo, BeiDou, NavIC).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerParameters {
    /// Time of Issue of Ephemeris in seconds of week,
    /// in the constellation's own timescale
    pub toe_s: f64,

    /// Semi-major axis (in meters)
    pub semi_major_axis_m: f64,

    /// Eccentricity
    pub eccentricity: f64,

    /// m0 (in radians)
    pub m0_rad: f64,

    /// (in radians)
    pub i0_rad: f64,

    /// (in radians/s)
    pub idot_rad_s: f64,

    /// (in radians)
    pub dn_rad: f64,

    /// (in radians)
    pub omega0_rad: f64,

    /// (in radians)
    pub omega_rad: f64,

    /// (in radians/s)
    pub omega_dot_rad_s: f64,

    /// Sine Cosine (in radians)
    pub cus_cuc_rad: (f64, f64),

    /// Sine / Cosine (in radians)
    pub cis_cic_rad: (f64, f64),

    /// Sine / Cosine (in meters)
    pub crs_crc_m: (f64, f64),

    /// Clock polynomial (s, s.s⁻¹, s.s⁻²)
    pub af: (f64, f64, f64),

    /// Broadcast group delays (s). Their meaning depends on the constellation:
    /// - GPS/QZSS/NavIC: TGD
    /// - Galileo: BGD E1/E5a, BGD E1/E5b
    /// - BeiDou: TGD B1I, TGD B2I/B2b, TGD B1Cp, TGD B2ap, ISC B1Cd, ISC B2ad
    pub tgd_s: [f64; 6],
}

/// GLONASS state vector parameters (PZ-90)
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlonassParameters {
    /// Position (m)
    pub position_m: (f64, f64, f64),
    /// Velocity (m/s)
    pub velocity_m_s: (f64, f64, f64),
    /// Luni-solar acceleration (m/s²)
    pub acceleration_m_s2: (f64, f64, f64),
    /// SV clock bias (s)
    pub taun_s: f64,
    /// SV relative frequency bias
    pub gamn: f64,
    /// Delay between L1 and L2 (s)
    pub dtaun_s: f64,
    /// Frequency channel number
    pub channel: i8,
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitParameters {
    Kepler(KeplerParameters),
    Glonass(GlonassParameters),
}

impl Default for OrbitParameters {
    fn default() -> Self {
        Self::Kepler(KeplerParameters::default())
    }
}

/// Broadcast [Ephemeris]
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ephemeris {
    /// [SV]
    pub sv: SV,

    /// [EphemerisSet] this frame belongs to
    pub set: EphemerisSet,

    /// Issue of data (ephemeris)
    pub iode: u16,

    /// Issue of data (clock)
    pub iodc: u16,

    /// Week number
    pub week: u32,

    /// Broadcast SV health
    pub health: u8,

    /// URA index (SISA for Galileo)
    pub accuracy: i32,

    /// Time of Issue of [Ephemeris]
    pub toe: Epoch,

    /// Time of Clock
    pub toc: Epoch,

    /// [OrbitParameters]
    pub parameters: OrbitParameters,
}

impl Ephemeris {
    /// Maximal age of [Ephemeris] frames, per [Constellation].
    pub fn max_age(constellation: Constellation) -> Duration {
        match constellation {
            Constellation::Galileo => 4.0 * Unit::Hour,
            Constellation::BeiDou => 6.0 * Unit::Hour,
            Constellation::Glonass => 30.0 * Unit::Minute,
            _ => 2.0 * Unit::Hour,
        }
    }

    /// Returns True if this [Ephemeris] frame is still valid at `t`.
    pub fn is_valid(&self, t: Epoch) -> bool {
        (t - self.toe).abs() <= Self::max_age(self.sv.constellation)
    }

    /// Returns broadcast group delay #`index` in seconds.
    /// GLONASS only defines one: -Δτn.
    pub fn group_delay_s(&self, index: usize) -> f64 {
        match &self.parameters {
            OrbitParameters::Kepler(kepler) => kepler.tgd_s.get(index).copied().unwrap_or(0.0),
            OrbitParameters::Glonass(glonass) => {
                if index == 0 {
                    -glonass.dtaun_s
                } else {
                    0.0
                }
            },
        }
    }

    /// Message number to broadcast this [Ephemeris] with.
    pub fn message_number(&self) -> Option<u16> {
        match self.sv.constellation {
            Constellation::GPS => Some(1019),
            Constellation::Glonass => Some(1020),
            Constellation::Galileo => match self.set {
                EphemerisSet::Primary => Some(1046),
                EphemerisSet::Secondary => Some(1045),
            },
            Constellation::QZSS => Some(1044),
            Constellation::BeiDou => Some(1042),
            Constellation::IRNSS => Some(1041),
            _ => None,
        }
    }

    /// Satellite clock offset (s) at `t`, without relativistic correction.
    /// `t` is iterated, as it is expressed in the satellite's time.
    pub(crate) fn clock_offset_s(&self, t: Epoch) -> f64 {
        match &self.parameters {
            OrbitParameters::Kepler(kepler) => kepler.clock_offset_s(self.toc, t),
            OrbitParameters::Glonass(glonass) => glonass.clock_offset_s(self.toe, t),
        }
    }

    /// Satellite position (ECEF m) and clock bias (s, relativistic term included) at `t`.
    pub(crate) fn position_clock(&self, t: Epoch) -> Option<(Vector3<f64>, f64)> {
        match &self.parameters {
            OrbitParameters::Kepler(kepler) => kepler.position_clock(self, t),
            OrbitParameters::Glonass(glonass) => Some(glonass.position_clock(self.toe, t)),
        }
    }

    /// Orbit and clock variance (m²), from the accuracy index.
    pub(crate) fn variance_m2(&self) -> f64 {
        const URA_VALUES: [f64; 15] = [
            2.4, 3.4, 4.85, 6.85, 9.65, 13.65, 24.0, 48.0, 96.0, 192.0, 384.0, 768.0, 1536.0,
            3072.0, 6144.0,
        ];
        const GLONASS_ERROR_M: f64 = 5.0;
        const GALILEO_NAPA_M: f64 = 500.0;

        let ura = self.accuracy;
        match (self.sv.constellation, &self.parameters) {
            (_, OrbitParameters::Glonass(_)) => GLONASS_ERROR_M.powi(2),
            (Constellation::Galileo, _) => {
                let sisa = ura as f64;
                let std = match ura {
                    i32::MIN..=49 => sisa * 0.01,
                    50..=74 => 0.5 + (sisa - 50.0) * 0.02,
                    75..=99 => 1.0 + (sisa - 75.0) * 0.04,
                    100..=125 => 2.0 + (sisa - 100.0) * 0.16,
                    _ => GALILEO_NAPA_M,
                };
                std.powi(2)
            },
            _ => match usize::try_from(ura).ok().and_then(|i| URA_VALUES.get(i)) {
                Some(std) => std.powi(2),
                None => URA_VALUES[14].powi(2),
            },
        }
    }
}

/// [EphemerisSource] provides [Ephemeris] data to the correction process.
pub trait EphemerisSource {
    /// Provide the [Ephemeris] frame for requested [SV], valid at [Epoch]
    /// (closest Time of Issue, within the constellation's maximal age).
    fn ephemeris_data(&self, t: Epoch, sv: SV) -> Option<&Ephemeris>;

    /// Provide the latest [Ephemeris] frame for requested [SV], whatever its age.
    fn latest(&self, sv: SV) -> Option<&Ephemeris>;
}

/// Accumulated [Ephemeris] frames, keyed by [SV] and [EphemerisSet].
/// Frames are only ever superseded, never deleted.
#[derive(Debug, Clone, Default)]
pub struct EphemerisTable {
    inner: HashMap<(SV, EphemerisSet), Ephemeris>,
}

impl EphemerisTable {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Stores a new [Ephemeris] frame. Returns true when it supersedes
    /// the current frame (or is the first for this satellite and set),
    /// false for repeated or outdated frames.
    pub fn update(&mut self, ephemeris: Ephemeris) -> bool {
        let key = (ephemeris.sv, ephemeris.set);
        match self.inner.get(&key) {
            Some(current) if ephemeris.toe < current.toe => {
                debug!(
                    "{}({}) - outdated ephemeris (toe={})",
                    current.toe, ephemeris.sv, ephemeris.toe
                );
                false
            },
            Some(current) if ephemeris.toe == current.toe && ephemeris.iode == current.iode => {
                false
            },
            _ => {
                self.inner.insert(key, ephemeris);
                true
            },
        }
    }

    /// Returns the [Ephemeris] frame of this [SV] and [EphemerisSet].
    pub fn get(&self, sv: SV, set: EphemerisSet) -> Option<&Ephemeris> {
        self.inner.get(&(sv, set))
    }
}

impl EphemerisSource for EphemerisTable {
    fn ephemeris_data(&self, t: Epoch, sv: SV) -> Option<&Ephemeris> {
        [EphemerisSet::Primary, EphemerisSet::Secondary]
            .iter()
            .filter_map(|set| self.get(sv, *set))
            .filter(|eph| eph.is_valid(t))
            .min_by_key(|eph| (t - eph.toe).abs().total_nanoseconds())
    }

    fn latest(&self, sv: SV) -> Option<&Ephemeris> {
        self.get(sv, EphemerisSet::Primary)
            .or_else(|| self.get(sv, EphemerisSet::Secondary))
    }
}

/// Two [EphemerisSource]s queried in order.
pub struct Chained<'a, A: EphemerisSource, B: EphemerisSource> {
    pub primary: &'a A,
    pub fallback: &'a B,
}

impl<A: EphemerisSource, B: EphemerisSource> EphemerisSource for Chained<'_, A, B> {
    fn ephemeris_data(&self, t: Epoch, sv: SV) -> Option<&Ephemeris> {
        self.primary
            .ephemeris_data(t, sv)
            .or_else(|| self.fallback.ephemeris_data(t, sv))
    }

    fn latest(&self, sv: SV) -> Option<&Ephemeris> {
        self.primary.latest(sv).or_else(|| self.fallback.latest(sv))
    }
}
