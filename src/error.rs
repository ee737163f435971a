use thiserror::Error;

use crate::{cfg::Error as ConfigError, codec::CodecError};

#[derive(Debug, Error)]
pub enum Error {
    /// Rover epoch without any observation
    #[error("no rover observations")]
    EmptyRoverSet,

    /// Base epoch without any observation
    #[error("no base observations")]
    EmptyBaseSet,

    /// Combined rover and base observations exceed our workspace.
    #[error("too many observations ({0})")]
    TooManyObservations(usize),

    /// Reference station position is unknown (or null).
    #[error("invalid base station position")]
    InvalidBasePosition,

    /// Correction left no valid pseudo range in this epoch.
    #[error("no valid pseudo range")]
    NoValidPseudoRange,

    /// Stream position could not be restored, this is fatal
    /// since base observations would be lost.
    #[error("failed to restore stream position {0}")]
    Rewind(u64),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
