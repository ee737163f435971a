#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod bias;
mod carrier;
mod cfg;
mod codec;
mod constants;
mod correction;
mod ephemeris;
mod error;
mod geometry;
mod matching;
mod observation;
mod orbit;
mod packer;
mod session;
mod stream;

#[cfg(feature = "cli")]
#[cfg_attr(docrs, doc(cfg(feature = "cli")))]
pub mod cli;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::bias::group_delay_m;
    pub use crate::carrier::Carrier;
    pub use crate::cfg::{Config, Error as ConfigError, MAX_FREQUENCIES};
    pub use crate::codec::{Codec, CodecError, Message, MsmBlock, ReferenceStation};
    pub use crate::constants::SPEED_OF_LIGHT_M_S;
    pub use crate::correction::{correct, Summary, Workspace};
    pub use crate::ephemeris::{
        Chained, Ephemeris, EphemerisSet, EphemerisSource, EphemerisTable, GlonassParameters,
        KeplerParameters, OrbitParameters,
    };
    pub use crate::geometry::{azimuth_elevation, ecef_to_geodetic, line_of_sight, AzEl};
    pub use crate::matching::{match_satellites, Match};
    pub use crate::observation::{
        sat_no, Code, CodeParsingError, Observation, ObservationSet, Receiver, Signal,
        MAX_OBSERVATIONS, MAX_SIGNAL_SLOTS,
    };
    pub use crate::orbit::{BroadcastOrbits, OrbitSource, SatelliteState};
    pub use crate::packer::{pack_ephemeris, pack_observations, Packing, MSM_CAPACITY};
    pub use crate::session::{Report, Session, SessionState};
    pub use crate::stream::{Checkpoint, Event, MessageStream, Rewind};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
