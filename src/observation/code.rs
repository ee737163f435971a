use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("invalid signal code \"{0}\"")]
    InvalidCode(String),
}

/// Signal [Code]: frequency band number and tracking attribute,
/// following the RINEX observable naming convention ("1C", "5Q", "7I"..).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Code {
    /// Band number (1..9)
    pub band: u8,
    /// Tracking attribute (C, P, W, I, Q, X..)
    pub attribute: char,
}

impl Default for Code {
    fn default() -> Self {
        Self::new(1, 'C')
    }
}

impl Code {
    pub const fn new(band: u8, attribute: char) -> Self {
        Self { band, attribute }
    }

    /// True if [Code] matches this band and one of these attributes.
    pub(crate) fn matches(&self, band: u8, attributes: &[char]) -> bool {
        self.band == band && attributes.contains(&self.attribute)
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.band, self.attribute)
    }
}

impl std::str::FromStr for Code {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(band), Some(attribute), None) => {
                let band = band
                    .to_digit(10)
                    .filter(|b| *b > 0)
                    .ok_or(ParsingError::InvalidCode(trimmed.to_string()))?;
                if !attribute.is_ascii_uppercase() {
                    return Err(ParsingError::InvalidCode(trimmed.to_string()));
                }
                Ok(Self::new(band as u8, attribute))
            },
            _ => Err(ParsingError::InvalidCode(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Code;
    use std::str::FromStr;

    #[test]
    fn code_parsing() {
        for (desc, expected) in [
            ("1C", Some(Code::new(1, 'C'))),
            ("5Q", Some(Code::new(5, 'Q'))),
            (" 7X ", Some(Code::new(7, 'X'))),
            ("0C", None),
            ("C1C", None),
            ("1c", None),
            ("", None),
        ] {
            assert_eq!(Code::from_str(desc).ok(), expected, "failed for \"{}\"", desc);
        }
        assert_eq!(Code::new(2, 'W').to_string(), "2W");
    }
}
