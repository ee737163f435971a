use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Deserialize;

use hifitime::Unit;

use crate::prelude::{Constellation, Duration, Epoch, TimeScale, SV};

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid number of frequencies {0} (1..3)")]
    InvalidFrequencies(usize),
    #[error("no constellation enabled")]
    NoConstellation,
    #[error("unknown constellation \"{0}\"")]
    UnknownConstellation(String),
    #[error("invalid satellite \"{0}\"")]
    InvalidSatellite(String),
    #[error("invalid epoch \"{0}\" (expecting y/m/d h:m:s)")]
    InvalidEpoch(String),
    #[error("synchronization tolerance must be positive")]
    InvalidSyncTolerance,
}

/// Maximal number of frequencies that may be corrected
pub const MAX_FREQUENCIES: usize = 3;

fn default_constellations() -> Vec<Constellation> {
    vec![
        Constellation::GPS,
        Constellation::Galileo,
        Constellation::BeiDou,
    ]
}

fn default_frequencies() -> usize {
    MAX_FREQUENCIES
}

fn default_elevation_mask() -> f64 {
    10.0
}

fn default_sync_tolerance() -> Duration {
    25.0 * Unit::Millisecond
}

fn default_max_variance() -> f64 {
    300.0 * 300.0
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Enabled [Constellation]s. Observations and ephemerides of other
    /// constellations are not corrected, nor forwarded.
    #[cfg_attr(feature = "serde", serde(default = "default_constellations"))]
    pub constellations: Vec<Constellation>,
    /// Number of frequencies to correct (1: L1, 2: L1+L2, 3: L1+L2+L5).
    #[cfg_attr(feature = "serde", serde(default = "default_frequencies"))]
    pub frequencies: usize,
    /// Elevation mask (in degrees), applied at the reference station.
    #[cfg_attr(feature = "serde", serde(default = "default_elevation_mask"))]
    pub elevation_mask_deg: f64,
    /// Satellites excluded from the correction process.
    #[cfg_attr(feature = "serde", serde(default))]
    pub excluded: Vec<SV>,
    /// Maximal time difference between a rover and a base epoch,
    /// for the two to be synchronous.
    #[cfg_attr(feature = "serde", serde(default = "default_sync_tolerance"))]
    pub sync_tolerance: Duration,
    /// Maximal ephemeris variance (m²). Less accurate satellites are excluded.
    #[cfg_attr(feature = "serde", serde(default = "default_max_variance"))]
    pub max_ephemeris_variance_m2: f64,
    /// Approximate [Epoch] of the streams, used to resolve
    /// week roll overs and ambiguous time stamps.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_epoch: Option<Epoch>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            constellations: default_constellations(),
            frequencies: default_frequencies(),
            elevation_mask_deg: default_elevation_mask(),
            excluded: Default::default(),
            sync_tolerance: default_sync_tolerance(),
            max_ephemeris_variance_m2: default_max_variance(),
            reference_epoch: None,
        }
    }
}

impl Config {
    /// Verifies this [Config] is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.frequencies == 0 || self.frequencies > MAX_FREQUENCIES {
            return Err(Error::InvalidFrequencies(self.frequencies));
        }
        if self.constellations.is_empty() {
            return Err(Error::NoConstellation);
        }
        if self.sync_tolerance <= Duration::ZERO {
            return Err(Error::InvalidSyncTolerance);
        }
        Ok(())
    }

    /// Returns true if this [Constellation] is enabled.
    pub fn is_enabled(&self, constellation: Constellation) -> bool {
        self.constellations.contains(&constellation)
    }

    /// Returns true if this [SV] is excluded by the user.
    pub fn is_excluded(&self, sv: SV) -> bool {
        self.excluded.contains(&sv)
    }

    /// Copies and returns [Config] with these [Constellation]s,
    /// from a comma separated list ("G,E,C").
    pub fn with_constellations_csv(&self, csv: &str) -> Result<Self, Error> {
        let mut s = self.clone();
        s.constellations.clear();
        for item in csv.split(',').map(|item| item.trim()) {
            let constellation = item
                .parse::<Constellation>()
                .map_err(|_| Error::UnknownConstellation(item.to_string()))?;
            if !s.constellations.contains(&constellation) {
                s.constellations.push(constellation);
            }
        }
        Ok(s)
    }

    /// Copies and returns [Config] with these excluded [SV]s,
    /// from a comma separated list ("G05,E11").
    pub fn with_excluded_csv(&self, csv: &str) -> Result<Self, Error> {
        let mut s = self.clone();
        for item in csv.split(',').map(|item| item.trim()) {
            if item.len() < 2 || !item.is_ascii() {
                return Err(Error::InvalidSatellite(item.to_string()));
            }
            let sv = item
                .parse::<SV>()
                .map_err(|_| Error::InvalidSatellite(item.to_string()))?;
            s.excluded.push(sv);
        }
        Ok(s)
    }

    /// Copies and returns [Config] with this reference [Epoch],
    /// described as "y/m/d h:m:s" in GPST.
    pub fn with_reference_epoch_str(&self, description: &str) -> Result<Self, Error> {
        let mut s = self.clone();
        s.reference_epoch = Some(parse_epoch(description)?);
        Ok(s)
    }
}

/// Parses "y/m/d h:m:s" (GPST).
fn parse_epoch(description: &str) -> Result<Epoch, Error> {
    let error = || Error::InvalidEpoch(description.to_string());

    let description = description.split_whitespace().collect::<Vec<_>>();
    if description.len() != 2 {
        return Err(error());
    }

    let utc = Epoch::from_format_str(&description.join(" "), "%Y/%m/%d %H:%M:%S")
        .map_err(|_| error())?;

    // same calendar description, in GPST
    let (year, month, day, hours, minutes, seconds, nanos) = utc.to_gregorian_utc();

    Epoch::maybe_from_gregorian(
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        nanos,
        TimeScale::GPST,
    )
    .map_err(|_| error())
}
