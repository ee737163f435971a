//! Correction session
use std::io::{Read, Write};

use log::{debug, error, info, warn};

use crate::{
    cfg::Config,
    codec::{Codec, CodecError, Message, ReferenceStation},
    correction::{correct, Workspace},
    ephemeris::{Chained, Ephemeris, EphemerisTable},
    error::Error,
    observation::{ObservationSet, Receiver},
    orbit::OrbitSource,
    packer::{pack_ephemeris, pack_observations},
    prelude::{Duration, Epoch, Vector3},
    stream::{Event, MessageStream},
};

/// Session statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Rover epochs processed
    pub rover_epochs: usize,
    /// Rover epochs corrected and written
    pub corrected_epochs: usize,
    /// Rover epochs that could not be corrected
    pub dropped_epochs: usize,
    /// Messages written to the output stream
    pub messages_written: usize,
    /// Ephemeris updates forwarded to the output stream
    pub ephemerides_forwarded: usize,
    /// Malformed messages on the rover stream
    pub rover_decode_errors: usize,
    /// Malformed messages on the base stream
    pub base_decode_errors: usize,
    /// Rover epochs without synchronous base epoch
    pub sync_misses: usize,
    /// Rover epochs dropped because base position was unknown
    pub missing_base_positions: usize,
    /// Constellations dropped because of message capacity
    pub capacity_drops: usize,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "epochs={} corrected={} dropped={} (sync={}, position={}) messages={} ephemerides={} decode errors={}/{}",
            self.rover_epochs,
            self.corrected_epochs,
            self.dropped_epochs,
            self.sync_misses,
            self.missing_base_positions,
            self.messages_written,
            self.ephemerides_forwarded,
            self.rover_decode_errors,
            self.base_decode_errors,
        )
    }
}

/// Everything a correction [Session] accumulates and mutates.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Latest rover [Epoch]
    pub rover_epoch: Option<Epoch>,
    /// [Ephemeris] collected from the rover stream
    pub rover_ephemerides: EphemerisTable,
    /// [Ephemeris] collected from the base stream
    pub base_ephemerides: EphemerisTable,
    /// Latest [ReferenceStation] description, from the base stream
    pub base_station: Option<ReferenceStation>,
    /// True once the base stream is exhausted
    pub base_exhausted: bool,
    /// Number of bytes written to the output stream
    pub output_position: u64,
    workspace: Workspace,
    messages: Vec<Message>,
    encoded: Vec<u8>,
}

impl SessionState {
    /// Reference station position, if known and not null.
    pub fn base_position(&self) -> Option<Vector3<f64>> {
        let (x, y, z) = self.base_station?.position_ecef_m;
        let position = Vector3::new(x, y, z);
        if position.norm() > 0.0 {
            Some(position)
        } else {
            None
        }
    }
}

/// [Session] reads a rover and a base stream, corrects rover pseudo ranges
/// epoch by epoch, and writes the corrected stream out.
/// Streams are consumed strictly forward, except for the base stream
/// which may step back by one epoch, when it is ahead of the rover.
pub struct Session<R, B, W, C, O> {
    cfg: Config,
    orbits: O,
    rover: MessageStream<R, C>,
    base: MessageStream<B, C>,
    output: W,
    encoder: C,
    state: SessionState,
    report: Report,
}

impl<R: Read, B: Read, W: Write, C: Codec, O: OrbitSource> Session<R, B, W, C, O> {
    /// Creates a new [Session]. One [Codec] is created (by `codec`)
    /// for each stream.
    pub fn new<F: Fn() -> C>(
        cfg: Config,
        orbits: O,
        rover: R,
        base: B,
        output: W,
        codec: F,
    ) -> Result<Self, Error> {
        cfg.validate()?;

        let mut rover = MessageStream::new(rover, codec(), Receiver::Rover);
        let mut base = MessageStream::new(base, codec(), Receiver::Base);
        let mut encoder = codec();

        if let Some(t) = cfg.reference_epoch {
            rover.codec_mut().set_reference_epoch(t);
            base.codec_mut().set_reference_epoch(t);
            encoder.set_reference_epoch(t);
        }

        Ok(Self {
            cfg,
            orbits,
            rover,
            base,
            output,
            encoder,
            state: SessionState::default(),
            report: Report::default(),
        })
    }

    /// [SessionState] snapshot
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current [Report]
    pub fn report(&self) -> Report {
        self.report
    }

    /// Read position of the base stream
    pub fn base_cursor(&self) -> u64 {
        self.base.position()
    }

    /// Consumes this [Session], returns the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until the end of the rover stream.
    /// Malformed messages, synchronization misses and correction failures
    /// are logged and reported. Only I/O failures (and base stream
    /// rewind failures) abort the session.
    pub fn run(&mut self) -> Result<Report, Error> {
        loop {
            let event = match self.rover.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!("rover - {} (byte {})", e, self.rover.position());
                    self.report.rover_decode_errors += 1;
                    continue;
                },
                Err(e) => {
                    error!("rover - {}", e);
                    return Err(e.into());
                },
            };

            match event {
                Event::Epoch(set) => self.process_epoch(set)?,
                Event::Ephemeris(eph) => self.forward_ephemeris(eph)?,
                Event::StationPosition(station) => {
                    debug!("rover - station #{} position ignored", station.station_id);
                },
            }
        }

        self.output.flush()?;
        info!("end of rover stream - {}", self.report);
        Ok(self.report)
    }

    fn process_epoch(&mut self, mut rover: ObservationSet) -> Result<(), Error> {
        let t = rover.epoch;
        self.state.rover_epoch = Some(t);
        self.report.rover_epochs += 1;

        debug!("{} - processing {} rover observations", t, rover.len());

        let base = match self.synchronize(t)? {
            Some(base) => base,
            None => {
                info!("{} - no synchronous base observations", t);
                self.report.sync_misses += 1;
                self.report.dropped_epochs += 1;
                return Ok(());
            },
        };

        let base_position = match self.state.base_position() {
            Some(position) => position,
            None => {
                info!("{} - unknown base station position", t);
                self.report.missing_base_positions += 1;
                self.report.dropped_epochs += 1;
                return Ok(());
            },
        };

        let ephemerides = Chained {
            primary: &self.state.rover_ephemerides,
            fallback: &self.state.base_ephemerides,
        };

        let summary = correct(
            &mut rover,
            &base,
            &base_position,
            &self.orbits,
            &ephemerides,
            &self.cfg,
            &mut self.state.workspace,
        );

        match summary {
            Ok(summary) => {
                debug!(
                    "{} - matched={} excluded={} corrected={}",
                    t, summary.matched, summary.excluded, summary.corrected
                );
            },
            Err(e) => {
                info!("{} - {}", t, e);
                self.report.dropped_epochs += 1;
                return Ok(());
            },
        }

        if !rover.iter().any(|obs| obs.has_pseudo_range()) {
            info!("{} - {}", t, Error::NoValidPseudoRange);
            self.report.dropped_epochs += 1;
            return Ok(());
        }

        let station_id = self
            .state
            .base_station
            .map(|station| station.station_id)
            .unwrap_or_default();

        self.state.messages.clear();
        let packing = pack_observations(&rover, &self.cfg, station_id, &mut self.state.messages);
        self.report.capacity_drops += packing.dropped.len();

        if self.write_messages()? {
            self.report.corrected_epochs += 1;
        } else {
            self.report.dropped_epochs += 1;
        }

        Ok(())
    }

    /// Reads the base stream forward, until the epoch synchronous to `t`.
    /// Earlier base epochs are discarded. A later base epoch is pushed back,
    /// since it may match a future rover epoch.
    fn synchronize(&mut self, t: Epoch) -> Result<Option<ObservationSet>, Error> {
        if self.state.base_exhausted {
            return Ok(None);
        }

        loop {
            let checkpoint = self.base.checkpoint();

            let event = match self.base.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!("{} - end of base stream", t);
                    self.state.base_exhausted = true;
                    return Ok(None);
                },
                Err(e) if e.is_recoverable() => {
                    warn!("base - {} (byte {})", e, self.base.position());
                    self.report.base_decode_errors += 1;
                    continue;
                },
                Err(e) => {
                    error!("base - {}", e);
                    return Err(e.into());
                },
            };

            match event {
                Event::Ephemeris(eph) => {
                    self.state.base_ephemerides.update(eph);
                },
                Event::StationPosition(station) => {
                    self.state.base_station = Some(station);
                },
                Event::Epoch(set) => {
                    let dt = set.epoch - t;
                    if dt.abs() <= self.cfg.sync_tolerance {
                        return Ok(Some(set));
                    }
                    if dt > Duration::ZERO {
                        debug!(
                            "{} - base is ahead ({}): back to byte {}",
                            t,
                            set.epoch,
                            checkpoint.position()
                        );
                        self.base.restore(checkpoint)?;
                        return Ok(None);
                    }
                    debug!("{} - base epoch {} discarded", t, set.epoch);
                },
            }
        }
    }

    fn forward_ephemeris(&mut self, eph: Ephemeris) -> Result<(), Error> {
        if !self.state.rover_ephemerides.update(eph) {
            return Ok(());
        }

        if let Some(message) = pack_ephemeris(&eph, &self.cfg) {
            debug!("{}({}) - forwarding ephemeris", eph.toe, eph.sv);
            self.state.messages.clear();
            self.state.messages.push(message);
            if self.write_messages()? {
                self.report.ephemerides_forwarded += 1;
            }
        }

        Ok(())
    }

    /// Encodes all pending messages, then writes them out.
    /// Nothing is written if one of them cannot be encoded.
    fn write_messages(&mut self) -> Result<bool, Error> {
        self.state.encoded.clear();

        for message in self.state.messages.iter() {
            match self.encoder.encode(message) {
                Ok(bytes) => self.state.encoded.extend_from_slice(&bytes),
                Err(CodecError::Io(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("{:?} - {}: dropped", self.state.rover_epoch, e);
                    return Ok(false);
                },
            }
        }

        self.output.write_all(&self.state.encoded)?;
        self.state.output_position += self.state.encoded.len() as u64;
        self.report.messages_written += self.state.messages.len();
        Ok(true)
    }
}
