use std::{
    cell::RefCell,
    io::{ErrorKind, Read},
    rc::Rc,
};

use crate::prelude::{Codec, CodecError, Message};

/// Frame preamble
const MARKER: u8 = 0xD3;

/// [Codec] that frames each [Message] as the preamble followed by
/// a 32 bit index into a shared registry. Clones share the registry,
/// so anything one instance encodes, another one decodes.
#[derive(Debug, Clone, Default)]
pub struct TestCodec {
    registry: Rc<RefCell<Vec<Message>>>,
}

impl TestCodec {
    /// Encodes these [Message]s, back to back.
    pub fn stream(&mut self, messages: &[Message]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for message in messages {
            bytes.extend(self.encode(message).unwrap());
        }
        bytes
    }

    /// Decodes all [Message]s, ignoring malformed content.
    pub fn decode_all(&mut self, bytes: &[u8]) -> Vec<Message> {
        let mut reader = bytes;
        let mut messages = Vec::new();
        loop {
            match self.decode_next(&mut reader) {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return messages,
                Err(e) => assert!(e.is_recoverable()),
            }
        }
    }
}

impl Codec for TestCodec {
    fn decode_next<R: Read>(&mut self, reader: &mut R) -> Result<Option<Message>, CodecError> {
        let mut preamble = [0u8; 1];
        if reader.read(&mut preamble)? == 0 {
            return Ok(None);
        }

        if preamble[0] != MARKER {
            return Err(CodecError::Malformed(format!(
                "unexpected byte 0x{:02x}",
                preamble[0]
            )));
        }

        let mut index = [0u8; 4];
        match reader.read_exact(&mut index) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(CodecError::Malformed("truncated frame".to_string()));
            },
            Err(e) => return Err(e.into()),
        }

        let index = u32::from_be_bytes(index) as usize;

        match self.registry.borrow().get(index) {
            Some(message) => Ok(Some(message.clone())),
            None => Err(CodecError::Malformed(format!("unknown frame #{}", index))),
        }
    }

    fn encode(&mut self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let mut registry = self.registry.borrow_mut();
        let index = registry.len() as u32;
        registry.push(message.clone());

        let mut bytes = vec![MARKER];
        bytes.extend_from_slice(&index.to_be_bytes());
        Ok(bytes)
    }
}

#[test]
fn test_codec_framing() {
    let mut codec = TestCodec::default();
    let messages = [Message::Unsupported(1230), Message::Unsupported(1033)];

    let mut bytes = vec![0x00];
    bytes.extend(codec.stream(&messages));
    bytes.extend([MARKER, 0x00]);

    let mut decoder = codec.clone();
    let mut reader = bytes.as_slice();

    assert!(matches!(
        decoder.decode_next(&mut reader),
        Err(CodecError::Malformed(_))
    ));
    assert_eq!(
        decoder.decode_next(&mut reader).unwrap(),
        Some(Message::Unsupported(1230))
    );
    assert_eq!(
        decoder.decode_next(&mut reader).unwrap(),
        Some(Message::Unsupported(1033))
    );
    assert!(matches!(
        decoder.decode_next(&mut reader),
        Err(CodecError::Malformed(_))
    ));
    assert!(decoder.decode_next(&mut reader).unwrap().is_none());
}
