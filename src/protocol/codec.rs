//! PTP frame codec (encode/decode)
//!
//! Pure functions that lay out outgoing frames and parse incoming ones. The
//! session layer owns all I/O.

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    Error, FRAME_SIZE, INCOMING_HEADER_SIZE, IncomingHeader, MAX_CHUNK_SIZE, MAX_MESSAGE_LEN,
    MessageType, OutgoingHeader, Result,
};

/// One fully laid out outgoing feature report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFrame {
    header: OutgoingHeader,
    chunk_len: usize,
    bytes: Bytes,
}

impl OutgoingFrame {
    /// Frame header
    #[must_use]
    pub const fn header(&self) -> &OutgoingHeader {
        &self.header
    }

    /// Message type carried in byte 2
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.header.message_type()
    }

    /// Declared length carried in bytes 3..5
    #[must_use]
    pub const fn declared_len(&self) -> u16 {
        self.header.declared_len()
    }

    /// Number of payload bytes before the zero padding
    #[must_use]
    pub const fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// The payload chunk without padding
    #[must_use]
    pub fn chunk(&self) -> &[u8] {
        &self.bytes[super::OUTGOING_HEADER_SIZE..super::OUTGOING_HEADER_SIZE + self.chunk_len]
    }

    /// All `FRAME_SIZE` bytes, ready for the transport
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One frame read back from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFrame {
    header: IncomingHeader,
    payload: Bytes,
}

impl IncomingFrame {
    /// Frame header
    #[must_use]
    pub const fn header(&self) -> &IncomingHeader {
        &self.header
    }

    /// Message type, `None` for an unknown type byte
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        self.header.message_type()
    }

    /// Declared length of the logical message this frame belongs to
    #[must_use]
    pub const fn declared_len(&self) -> u16 {
        self.header.declared_len()
    }

    /// Payload truncated to the declared length
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload as text, replacing invalid UTF-8 sequences
    #[must_use]
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Lay out one outgoing frame
///
/// # Format
///
/// ```text
/// [00 FF] [TYPE] [DECLARED LEN (2, LE)] [CHUNK (<= 239)] [ZERO PADDING]
/// ```
///
/// # Errors
///
/// Returns [`Error::ChunkTooLarge`] if `chunk` does not fit in one frame.
pub fn encode_frame(msg_type: MessageType, declared_len: u16, chunk: &[u8]) -> Result<OutgoingFrame> {
    if chunk.len() > MAX_CHUNK_SIZE {
        return Err(Error::ChunkTooLarge {
            len: chunk.len(),
            max: MAX_CHUNK_SIZE,
        });
    }

    let header = OutgoingHeader::new(msg_type, declared_len);
    let mut bytes = BytesMut::with_capacity(FRAME_SIZE);
    bytes.put_slice(&header.to_bytes());
    bytes.put_slice(chunk);
    bytes.resize(FRAME_SIZE, 0);

    Ok(OutgoingFrame {
        header,
        chunk_len: chunk.len(),
        bytes: bytes.freeze(),
    })
}

/// Split a logical message into outgoing frames
///
/// The first frame carries `FIRST`, every later frame `MID`. Each frame declares
/// the number of bytes not yet sent when that frame starts, so the device can
/// count down to the end of the message.
///
/// # Errors
///
/// - [`Error::EmptyCommand`] if `message` is empty
/// - [`Error::MessageTooLong`] if `message` does not fit the 16-bit length field
pub fn chunk_message(message: &[u8]) -> Result<Vec<OutgoingFrame>> {
    if message.is_empty() {
        return Err(Error::EmptyCommand);
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(Error::MessageTooLong {
            len: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }

    let mut frames = Vec::with_capacity(message.len().div_ceil(MAX_CHUNK_SIZE));
    for (index, chunk) in message.chunks(MAX_CHUNK_SIZE).enumerate() {
        let offset = index * MAX_CHUNK_SIZE;
        let msg_type = if index == 0 {
            MessageType::First
        } else {
            MessageType::Mid
        };
        // Bounded by MAX_MESSAGE_LEN above.
        let remaining = u16::try_from(message.len() - offset).unwrap_or(u16::MAX);
        frames.push(encode_frame(msg_type, remaining, chunk)?);
    }

    Ok(frames)
}

/// Parse one incoming frame
///
/// The payload starts at byte 6 and is cut to `min(declared length, bytes
/// available)`, which drops the zero padding. Frames shorter than the header
/// yield an empty payload.
#[must_use]
pub fn decode_frame(frame: &[u8]) -> IncomingFrame {
    let header = IncomingHeader::parse(frame);
    let available = frame.get(INCOMING_HEADER_SIZE..).unwrap_or_default();
    let len = available.len().min(usize::from(header.declared_len()));

    IncomingFrame {
        header,
        payload: Bytes::copy_from_slice(&available[..len]),
    }
}
