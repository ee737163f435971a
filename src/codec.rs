//! Wire codec interface and message catalog
use std::io::Read;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ephemeris::Ephemeris,
    observation::Observation,
    prelude::{Constellation, Epoch},
};

#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed message: it was skipped and the stream is positioned
    /// at the next message boundary.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// Well formed message that cannot be encoded or decoded.
    #[error("unsupported message #{0}")]
    Unsupported(u16),
    /// Underlying I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Returns true when the stream may be consumed further.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// One [Constellation]'s share of an observation epoch,
/// as carried by one multi signal message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MsmBlock {
    /// Reference station ID
    pub station_id: u16,
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// [Constellation]
    pub constellation: Constellation,
    /// Multiple message flag: more messages of this epoch follow.
    pub sync: bool,
    /// [Observation]s of this [Constellation]
    pub observations: Vec<Observation>,
}

impl MsmBlock {
    /// MSM5 message number of this [Constellation]
    pub fn message_number(constellation: Constellation) -> Option<u16> {
        match constellation {
            Constellation::GPS => Some(1075),
            Constellation::Glonass => Some(1085),
            Constellation::Galileo => Some(1095),
            Constellation::QZSS => Some(1115),
            Constellation::BeiDou => Some(1125),
            Constellation::IRNSS => Some(1135),
            _ => None,
        }
    }

    /// Number of satellites in this block
    pub fn num_satellites(&self) -> usize {
        self.observations.len()
    }

    /// Number of distinct signals in this block
    pub fn num_signals(&self) -> usize {
        let mut codes = Vec::with_capacity(8);
        for code in self.observations.iter().flat_map(|obs| obs.codes()) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        codes.len()
    }
}

/// Reference station description
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceStation {
    /// Reference station ID
    pub station_id: u16,
    /// Antenna reference point, ECEF (m)
    pub position_ecef_m: (f64, f64, f64),
}

/// Typed messages, exchanged with the [Codec]
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Multi signal observations
    Msm(MsmBlock),
    /// Broadcast [Ephemeris]
    Ephemeris(Ephemeris),
    /// Reference station position
    StationPosition(ReferenceStation),
    /// Well formed message of another kind (number)
    Unsupported(u16),
}

impl Message {
    /// Message number
    pub fn number(&self) -> Option<u16> {
        match self {
            Self::Msm(block) => MsmBlock::message_number(block.constellation),
            Self::Ephemeris(eph) => eph.message_number(),
            Self::StationPosition(_) => Some(1005),
            Self::Unsupported(number) => Some(*number),
        }
    }
}

/// Binary message encoder / decoder. The correction process never
/// interprets raw bytes itself.
pub trait Codec {
    /// Decodes the next [Message]. Returns Ok(None) at the end of stream.
    /// On [CodecError::Malformed], the stream must be left at the next
    /// message boundary. Implementations must not read past the decoded
    /// message, so the stream position always lies on a message boundary.
    fn decode_next<R: Read>(&mut self, reader: &mut R) -> Result<Option<Message>, CodecError>;

    /// Encodes this [Message].
    fn encode(&mut self, message: &Message) -> Result<Vec<u8>, CodecError>;

    /// Approximate [Epoch] of the stream, used to resolve
    /// ambiguous time stamps. Ignored by default.
    fn set_reference_epoch(&mut self, _epoch: Epoch) {}
}
