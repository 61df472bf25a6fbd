//! On-air test message and key sanitation.
//!
//! A message is a little-endian `u16` slot counter followed by the key bytes.
//! Key bytes are restricted to printable ASCII without `\` and `"` so that
//! they can be embedded verbatim in log records; anything else becomes `?`.

use core::fmt;

use crate::plan::{Key, MAX_KEY_LEN};

/// Bytes taken by the counter at the start of a payload.
pub const COUNTER_LEN: usize = 2;

/// Largest payload a message can occupy.
pub const MAX_PAYLOAD_LEN: usize = COUNTER_LEN + MAX_KEY_LEN;

/// Replacement for bytes that fail sanitation.
pub const SUBSTITUTE: u8 = b'?';

/// `true` for bytes that pass sanitation unchanged.
pub fn is_clean_byte(byte: u8) -> bool {
    (33..=126).contains(&byte) && byte != b'\\' && byte != b'"'
}

/// Sanitizes `bytes` in place and returns the number of substituted bytes.
pub fn sanitize(bytes: &mut [u8]) -> usize {
    let mut replaced = 0;
    for byte in bytes.iter_mut().filter(|byte| !is_clean_byte(**byte)) {
        *byte = SUBSTITUTE;
        replaced += 1;
    }
    replaced
}

/// Sanitized copy of `bytes`, truncated to [`MAX_KEY_LEN`].
pub fn sanitized_key(bytes: &[u8]) -> Key {
    let mut key = Key::new();
    for &byte in bytes.iter().take(MAX_KEY_LEN) {
        let clean = if is_clean_byte(byte) { byte } else { SUBSTITUTE };
        // Capacity is guaranteed by the `take` above.
        let _ = key.push(char::from(clean));
    }
    key
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    BufferTooSmall { needed: usize, available: usize },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::BufferTooSmall { needed, available } => write!(
                f,
                "payload buffer too small: need {needed} bytes, have {available}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MessageError {}

/// Payload of one test packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub counter: u16,
    pub key: Key,
}

impl Message {
    pub fn new(counter: u16, key: Key) -> Self {
        Self { counter, key }
    }

    pub fn encoded_len(&self) -> usize {
        COUNTER_LEN + self.key.len()
    }

    /// Writes the message into `buf` and returns the payload length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, MessageError> {
        let needed = self.encoded_len();
        if buf.len() < needed {
            return Err(MessageError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        buf[..COUNTER_LEN].copy_from_slice(&self.counter.to_le_bytes());
        let key = &mut buf[COUNTER_LEN..needed];
        key.copy_from_slice(self.key.as_bytes());
        sanitize(key);
        Ok(needed)
    }

    /// Decodes a received payload.
    ///
    /// Only the key bytes are sanitized; the counter is taken verbatim. A
    /// payload shorter than the counter yields whatever counter bytes exist
    /// and an empty key.
    pub fn from_received(payload: &[u8]) -> Self {
        let mut counter = [0u8; COUNTER_LEN];
        let head = payload.len().min(COUNTER_LEN);
        counter[..head].copy_from_slice(&payload[..head]);
        Self {
            counter: u16::from_le_bytes(counter),
            key: sanitized_key(payload.get(COUNTER_LEN..).unwrap_or(&[])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_quote_and_backslash() {
        let mut bytes = [0x22, 0x5C, 0x41];
        assert_eq!(sanitize(&mut bytes), 2);
        assert_eq!(&bytes, b"??A");
    }

    #[test]
    fn short_payload_keeps_partial_counter() {
        let message = Message::from_received(&[0x07]);
        assert_eq!(message.counter, 7);
        assert!(message.key.is_empty());
    }

    #[test]
    fn encode_rejects_small_buffer() {
        let mut key = Key::new();
        key.push_str("abc").unwrap();
        let message = Message::new(1, key);
        let mut buf = [0u8; 4];
        assert_eq!(
            message.encode(&mut buf),
            Err(MessageError::BufferTooSmall {
                needed: 5,
                available: 4
            })
        );
    }
}
