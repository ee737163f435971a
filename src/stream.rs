//! Message streams
use std::io::Read;

use log::{debug, trace, warn};

use crate::{
    codec::{Codec, CodecError, Message, MsmBlock, ReferenceStation},
    ephemeris::Ephemeris,
    error::Error,
    observation::{ObservationSet, Receiver},
};

/// [Read]er that can restore a previous read position.
/// Bytes read since the latest checkpoint are retained, so this
/// does not require the underlying reader to be seekable.
#[derive(Debug)]
pub struct Rewind<R> {
    inner: R,
    /// Bytes read since the latest checkpoint
    buffer: Vec<u8>,
    /// Replay position, within buffer
    cursor: usize,
    /// Absolute position of buffer[0]
    origin: u64,
    /// Absolute position of the next byte
    position: u64,
    recording: bool,
}

impl<R: Read> Rewind<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            cursor: 0,
            origin: 0,
            position: 0,
            recording: false,
        }
    }

    /// Absolute read position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Saves and returns the current read position.
    /// Prior checkpoints are released.
    pub fn checkpoint(&mut self) -> u64 {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.origin = self.position;
        self.recording = true;
        self.position
    }

    /// Restores a read position, saved by (or read since) the latest checkpoint.
    pub fn restore(&mut self, position: u64) -> Result<(), Error> {
        if !self.recording || position < self.origin {
            return Err(Error::Rewind(position));
        }

        let offset = usize::try_from(position - self.origin).map_err(|_| Error::Rewind(position))?;
        if offset > self.buffer.len() {
            return Err(Error::Rewind(position));
        }

        self.cursor = offset;
        self.position = position;
        Ok(())
    }
}

impl<R: Read> Read for Rewind<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.cursor < self.buffer.len() {
            let size = buf.len().min(self.buffer.len() - self.cursor);
            buf[..size].copy_from_slice(&self.buffer[self.cursor..self.cursor + size]);
            self.cursor += size;
            self.position += size as u64;
            return Ok(size);
        }

        let size = self.inner.read(buf)?;

        if self.recording {
            self.buffer.extend_from_slice(&buf[..size]);
            self.cursor += size;
        }

        self.position += size as u64;
        Ok(size)
    }
}

/// Decoded stream content
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Complete observation epoch
    Epoch(ObservationSet),
    /// Broadcast [Ephemeris]
    Ephemeris(Ephemeris),
    /// Reference station position
    StationPosition(ReferenceStation),
}

/// Saved [MessageStream] state
#[derive(Debug, Clone)]
pub struct Checkpoint {
    position: u64,
    pending: Option<ObservationSet>,
}

impl Checkpoint {
    /// Saved read position
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// [MessageStream] decodes [Message]s of one [Receiver], and assembles
/// multi signal messages into complete observation epochs.
pub struct MessageStream<R, C> {
    reader: Rewind<R>,
    codec: C,
    receiver: Receiver,
    /// Epoch being assembled
    pending: Option<ObservationSet>,
}

impl<R: Read, C: Codec> MessageStream<R, C> {
    pub fn new(reader: R, codec: C, receiver: Receiver) -> Self {
        Self {
            reader: Rewind::new(reader),
            codec,
            receiver,
            pending: None,
        }
    }

    /// Mutable access to our [Codec]
    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    /// Absolute read position
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// Saves the stream state (read position and epoch being assembled).
    pub fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint {
            position: self.reader.checkpoint(),
            pending: self.pending.clone(),
        }
    }

    /// Restores the stream state, saved by the latest [Self::checkpoint].
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), Error> {
        self.reader.restore(checkpoint.position)?;
        self.pending = checkpoint.pending;
        Ok(())
    }

    /// Returns the next [Event], Ok(None) at the end of stream.
    /// [CodecError::Malformed] and [CodecError::Unsupported]
    /// are recoverable: the stream may be consumed further.
    pub fn next_event(&mut self) -> Result<Option<Event>, CodecError> {
        loop {
            let message = match self.codec.decode_next(&mut self.reader)? {
                Some(message) => message,
                None => {
                    if let Some(pending) = self.pending.take() {
                        debug!(
                            "{}({}) - end of stream: incomplete epoch dropped",
                            pending.epoch, self.receiver
                        );
                    }
                    return Ok(None);
                },
            };

            match message {
                Message::Msm(block) => {
                    if let Some(set) = self.assemble(block) {
                        return Ok(Some(Event::Epoch(set)));
                    }
                },
                Message::Ephemeris(eph) => return Ok(Some(Event::Ephemeris(eph))),
                Message::StationPosition(station) => {
                    return Ok(Some(Event::StationPosition(station)))
                },
                Message::Unsupported(number) => {
                    trace!("{} - message #{} ignored", self.receiver, number);
                },
            }
        }
    }

    /// Appends this block to the epoch being assembled,
    /// returns the epoch once complete.
    fn assemble(&mut self, block: MsmBlock) -> Option<ObservationSet> {
        let mut set = match self.pending.take() {
            Some(pending) if pending.epoch == block.epoch => pending,
            Some(pending) => {
                warn!(
                    "{}({}) - incomplete epoch dropped",
                    pending.epoch, self.receiver
                );
                ObservationSet::new(block.epoch, self.receiver)
            },
            None => ObservationSet::new(block.epoch, self.receiver),
        };

        for observation in block.observations {
            set.push(observation);
        }

        if block.sync {
            self.pending = Some(set);
            None
        } else {
            set.sort();
            Some(set)
        }
    }
}
