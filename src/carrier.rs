#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nominal carrier frequencies, used to scale broadcast group delays
/// from one signal pair to another.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1aB1c
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS/NavIC) same frequency as E5A and B2A
    L5,
    /// E5B (Galileo) same frequency as B2iB2b
    E5B,
    /// S band (NavIC)
    S,
    /// G1 (Glonass) base frequency
    G1,
    /// G2 (Glonass) base frequency
    G2,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::E5B => write!(f, "E5B"),
            Self::S => write!(f, "S"),
            Self::G1 => write!(f, "G1"),
            Self::G2 => write!(f, "G2"),
        }
    }
}

impl Carrier {
    /// Nominal frequency in Hz
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 => 1176.45E6_f64,
            Self::E5B => 1207.14E6_f64,
            Self::S => 2492.028E6_f64,
            Self::G1 => 1602.0E6_f64,
            Self::G2 => 1246.0E6_f64,
        }
    }

    /// Squared frequency ratio (self / rhs)², the ionospheric scaling law
    /// between two signals.
    pub fn gamma(&self, rhs: Carrier) -> f64 {
        (self.frequency() / rhs.frequency()).powi(2)
    }
}
