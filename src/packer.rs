//! Output message packing
use log::{debug, warn};

use crate::{
    cfg::Config,
    codec::{Message, MsmBlock},
    ephemeris::Ephemeris,
    observation::{Code, Observation, ObservationSet},
    prelude::Constellation,
};

/// Maximal number of (satellite x signal) cells per multi signal message
pub const MSM_CAPACITY: usize = 64;

/// Constellation order, within one epoch
const MSM_ORDER: [Constellation; 6] = [
    Constellation::GPS,
    Constellation::Glonass,
    Constellation::Galileo,
    Constellation::QZSS,
    Constellation::BeiDou,
    Constellation::IRNSS,
];

/// Packing plan of one [Constellation]
struct Plan<'a> {
    constellation: Constellation,
    observations: Vec<&'a Observation>,
    /// Satellites per message, 0 when no satellite
    satellites_per_msg: usize,
}

impl<'a> Plan<'a> {
    /// Forms the packing plan of this [Constellation].
    /// Returns None when its signals alone exceed the message capacity.
    fn new(set: &'a ObservationSet, constellation: Constellation) -> Option<Self> {
        let observations = set
            .constellation_iter(constellation)
            .filter(|obs| obs.has_pseudo_range())
            .collect::<Vec<_>>();

        let mut codes = Vec::<Code>::with_capacity(16);
        for code in observations.iter().flat_map(|obs| obs.codes()) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        let num_signals = codes.len();
        if num_signals > MSM_CAPACITY {
            warn!(
                "{}({}) - too many signals ({}): dropped",
                set.epoch, constellation, num_signals
            );
            return None;
        }

        let satellites_per_msg = if num_signals == 0 {
            0
        } else {
            MSM_CAPACITY / num_signals
        };

        Some(Self {
            constellation,
            observations,
            satellites_per_msg,
        })
    }

    /// Number of messages to emit
    fn num_messages(&self) -> usize {
        if self.observations.is_empty() {
            1
        } else {
            self.observations.len().div_ceil(self.satellites_per_msg)
        }
    }
}

/// Outcome of [pack_observations]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    /// Number of messages generated
    pub messages: usize,
    /// [Constellation]s that could not be packed
    pub dropped: Vec<Constellation>,
}

/// Packs one corrected [ObservationSet] into multi signal messages,
/// one group per enabled [Constellation] (even when empty), each message
/// describing at most [MSM_CAPACITY] (satellite x signal) cells.
/// Only [Observation]s with at least one valid pseudo range are packed.
///
/// All messages of the epoch but the last one have their multiple message
/// flag (sync) asserted. Messages are appended to `messages`.
pub fn pack_observations(
    set: &ObservationSet,
    cfg: &Config,
    station_id: u16,
    messages: &mut Vec<Message>,
) -> Packing {
    let mut packing = Packing::default();

    let plans = MSM_ORDER
        .iter()
        .filter(|constellation| cfg.is_enabled(**constellation))
        .filter_map(|constellation| {
            let plan = Plan::new(set, *constellation);
            if plan.is_none() {
                packing.dropped.push(*constellation);
            }
            plan
        })
        .collect::<Vec<_>>();

    let num_plans = plans.len();

    for (plan_index, plan) in plans.iter().enumerate() {
        let last_plan = plan_index + 1 == num_plans;
        let num_messages = plan.num_messages();

        debug!(
            "{}({}) - {} satellites in {} message(s)",
            set.epoch,
            plan.constellation,
            plan.observations.len(),
            num_messages
        );

        for msg_index in 0..num_messages {
            let observations = if plan.satellites_per_msg == 0 {
                Vec::new()
            } else {
                plan.observations
                    .iter()
                    .skip(msg_index * plan.satellites_per_msg)
                    .take(plan.satellites_per_msg)
                    .map(|obs| (*obs).clone())
                    .collect::<Vec<_>>()
            };

            let sync = msg_index + 1 < num_messages || !last_plan;

            messages.push(Message::Msm(MsmBlock {
                station_id,
                epoch: set.epoch,
                constellation: plan.constellation,
                sync,
                observations,
            }));

            packing.messages += 1;
        }
    }

    packing
}

/// Forms the output message of this [Ephemeris] update.
/// None when its [Constellation] is not enabled, or cannot be broadcast.
pub fn pack_ephemeris(eph: &Ephemeris, cfg: &Config) -> Option<Message> {
    if !cfg.is_enabled(eph.sv.constellation) {
        return None;
    }
    eph.message_number()?;
    Some(Message::Ephemeris(*eph))
}
