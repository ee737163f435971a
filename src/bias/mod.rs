//! Satellite group delays
use crate::{
    carrier::Carrier,
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::Ephemeris,
    observation::Code,
    prelude::Constellation,
};

/// Selects the broadcast group delay coefficient(s) to apply.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Selector {
    /// Single coefficient
    Index(usize),
    /// Sum of two coefficients
    Sum(usize, usize),
}

impl Selector {
    fn value_s(&self, eph: &Ephemeris) -> f64 {
        match self {
            Self::Index(i) => eph.group_delay_s(*i),
            Self::Sum(i, j) => eph.group_delay_s(*i) + eph.group_delay_s(*j),
        }
    }
}

/// Scaling applied to the selected coefficient, when it was broadcast
/// with respect to another signal pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Scaling {
    None,
    /// (f_lhs / f_rhs)²
    Gamma(Carrier, Carrier),
    /// 1 / ((f_G1 / f_G2)² - 1)
    GlonassInterFrequency,
}

impl Scaling {
    fn factor(&self) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Gamma(lhs, rhs) => lhs.gamma(*rhs),
            Self::GlonassInterFrequency => 1.0 / (Carrier::G1.gamma(Carrier::G2) - 1.0),
        }
    }
}

/// One entry of a [GroupDelayModel]: signals of this band
/// and any of these attributes.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Rule {
    band: u8,
    attributes: &'static [char],
    selector: Selector,
    scaling: Scaling,
}

const fn rule(band: u8, attributes: &'static [char], selector: Selector, scaling: Scaling) -> Rule {
    Rule {
        band,
        attributes,
        selector,
        scaling,
    }
}

/// Per [Constellation] group delay model: ordered [Rule]s,
/// first match applies, otherwise the fallback does.
#[derive(Debug, Copy, Clone)]
pub(crate) struct GroupDelayModel {
    rules: &'static [Rule],
    fallback: (Selector, Scaling),
}

const GPS_RULES: [Rule; 2] = [
    rule(
        5,
        &['I', 'Q', 'X'],
        Selector::Index(1),
        Scaling::Gamma(Carrier::L1, Carrier::L5),
    ),
    rule(
        2,
        &['C', 'D', 'S', 'L', 'X', 'P', 'W', 'Y', 'M', 'N'],
        Selector::Index(0),
        Scaling::Gamma(Carrier::L1, Carrier::L2),
    ),
];

const QZSS_RULES: [Rule; 2] = [
    rule(
        5,
        &['D', 'P', 'Z', 'I', 'Q', 'X'],
        Selector::Index(1),
        Scaling::Gamma(Carrier::L1, Carrier::L5),
    ),
    rule(
        2,
        &['S', 'L', 'X'],
        Selector::Index(0),
        Scaling::Gamma(Carrier::L1, Carrier::L2),
    ),
];

const GALILEO_RULES: [Rule; 2] = [
    // BGD E1/E5a
    rule(
        5,
        &['I', 'Q', 'X'],
        Selector::Index(0),
        Scaling::Gamma(Carrier::L1, Carrier::L5),
    ),
    // BGD E1/E5b
    rule(
        7,
        &['I', 'Q', 'X'],
        Selector::Index(1),
        Scaling::Gamma(Carrier::L1, Carrier::E5B),
    ),
];

const BEIDOU_RULES: [Rule; 6] = [
    // TGD B1I
    rule(2, &['I'], Selector::Index(0), Scaling::None),
    // TGD B2I/B2b
    rule(7, &['I', 'Q', 'X', 'D', 'P', 'Z'], Selector::Index(1), Scaling::None),
    // TGD B1Cp
    rule(1, &['P'], Selector::Index(2), Scaling::None),
    // TGD B2ap
    rule(5, &['P'], Selector::Index(3), Scaling::None),
    // ISC B2ad
    rule(5, &['X', 'D'], Selector::Index(5), Scaling::None),
    rule(8, &['X'], Selector::Index(5), Scaling::None),
];

impl GroupDelayModel {
    /// [GroupDelayModel] of this [Constellation], None when
    /// group delays do not apply.
    pub(crate) fn from_constellation(constellation: Constellation) -> Option<Self> {
        match constellation {
            Constellation::GPS => Some(Self {
                rules: &GPS_RULES,
                fallback: (Selector::Index(0), Scaling::None),
            }),
            Constellation::QZSS => Some(Self {
                rules: &QZSS_RULES,
                fallback: (Selector::Index(0), Scaling::None),
            }),
            Constellation::Glonass => Some(Self {
                rules: &[],
                fallback: (Selector::Index(0), Scaling::GlonassInterFrequency),
            }),
            Constellation::Galileo => Some(Self {
                rules: &GALILEO_RULES,
                fallback: (Selector::Index(1), Scaling::None),
            }),
            Constellation::BeiDou => Some(Self {
                rules: &BEIDOU_RULES,
                // TGD B1Cp + ISC B1Cd
                fallback: (Selector::Sum(2, 4), Scaling::None),
            }),
            Constellation::IRNSS => Some(Self {
                rules: &[],
                fallback: (Selector::Index(0), Scaling::Gamma(Carrier::S, Carrier::L5)),
            }),
            _ => None,
        }
    }

    fn select(&self, code: Code) -> (Selector, Scaling) {
        self.rules
            .iter()
            .find(|rule| code.matches(rule.band, rule.attributes))
            .map(|rule| (rule.selector, rule.scaling))
            .unwrap_or(self.fallback)
    }
}

/// Group delay (in meters) affecting this signal [Code], from the
/// broadcast [Ephemeris]. Zero for constellations without a model.
pub fn group_delay_m(eph: &Ephemeris, code: Code) -> f64 {
    match GroupDelayModel::from_constellation(eph.sv.constellation) {
        Some(model) => {
            let (selector, scaling) = model.select(code);
            selector.value_s(eph) * SPEED_OF_LIGHT_M_S * scaling.factor()
        },
        None => 0.0,
    }
}
