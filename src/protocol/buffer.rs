//! Shared message buffer with bounds-checked cursors.
//!
//! A single fixed-capacity `BytesMut` is used both to stage the outbound
//! request and to hold every inbound response chunk:
//! - Outbound: items are appended at the end (the write cursor is the length).
//! - Inbound: a read cursor walks the received chunk; the tag byte is skipped.
//!
//! Decoding never reads past the bytes of the current chunk. A failed decode
//! leaves the read cursor where it was.
//!
//! # Example
//!
//! ```
//! use transformer_client::protocol::MessageBuffer;
//!
//! let mut buf = MessageBuffer::new();
//! buf.begin(0x02, &[0u8; 16]);
//! assert!(buf.encode_string(b"Device."));
//! assert_eq!(buf.len(), 1 + 16 + 2 + 7);
//! ```

use bytes::{Buf, BufMut, BytesMut};

use super::wire_format::{
    is_terminal, BUFFER_CAPACITY, IDENTITY_LEN, MAX_MESSAGE_SIZE, MAX_STRING_LEN, TERMINAL_FLAG,
};

/// Which way the buffer contents are flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Staging a request.
    Outbound,
    /// Holding a received response chunk.
    Inbound,
}

/// Fixed-capacity buffer reused for requests and responses.
pub struct MessageBuffer {
    data: BytesMut,
    read_pos: usize,
    direction: Direction,
}

impl MessageBuffer {
    /// Create an empty buffer with room for one maximum-size message.
    pub fn new() -> Self {
        Self {
            data: BytesMut::with_capacity(BUFFER_CAPACITY),
            read_pos: 0,
            direction: Direction::Outbound,
        }
    }

    /// Discard all contents.
    pub fn clear(&mut self) {
        self.data.clear();
        self.read_pos = 0;
        self.direction = Direction::Outbound;
    }

    /// Start a new request: tag byte followed by the identity token.
    pub fn begin(&mut self, tag: u8, identity: &[u8; IDENTITY_LEN]) {
        self.clear();
        self.data.put_u8(tag);
        self.data.put_slice(identity);
    }

    /// The leading tag byte, if any.
    #[inline]
    pub fn tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Whether the current message carries the terminal flag.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.tag().map_or(false, is_terminal)
    }

    /// Number of valid bytes (the write cursor while staging a request).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer holds no message at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the buffer currently holds a received chunk.
    #[inline]
    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::Inbound
    }

    /// Drop staged bytes beyond `len`.
    ///
    /// Used to roll back a partially encoded item.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Raw message bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes room left before the message reaches the maximum size.
    #[inline]
    pub fn available(&self) -> usize {
        MAX_MESSAGE_SIZE.saturating_sub(self.data.len())
    }

    /// Set the terminal flag on the tag byte.
    pub fn mark_terminal(&mut self) {
        if let Some(tag) = self.data.first_mut() {
            *tag |= TERMINAL_FLAG;
        }
    }

    /// Append a Big Endian `u16`.
    ///
    /// Returns `false` without writing anything if the message would exceed
    /// the maximum size.
    pub fn encode_u16(&mut self, value: u16) -> bool {
        if self.available() < 2 {
            return false;
        }
        self.data.put_u16(value);
        true
    }

    /// Append a length-prefixed string.
    ///
    /// Returns `false` without writing anything if the string is longer than
    /// 65535 bytes or the message would exceed the maximum size.
    pub fn encode_string(&mut self, s: &[u8]) -> bool {
        if s.len() > MAX_STRING_LEN || self.available() < 2 + s.len() {
            return false;
        }
        self.data.put_u16(s.len() as u16);
        self.data.put_slice(s);
        true
    }

    /// Replace the contents with one received message.
    ///
    /// `read` receives the full-capacity buffer and returns the number of
    /// bytes it filled. The read cursor is placed just after the tag byte.
    pub fn fill_from<F, E>(&mut self, read: F) -> Result<usize, E>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, E>,
    {
        self.data.clear();
        self.data.resize(BUFFER_CAPACITY, 0);
        let n = match read(&mut self.data[..]) {
            Ok(n) => n.min(BUFFER_CAPACITY),
            Err(e) => {
                self.clear();
                return Err(e);
            }
        };
        self.data.truncate(n);
        self.read_pos = 1;
        self.direction = Direction::Inbound;
        Ok(n)
    }

    /// Bytes of the current chunk not yet decoded.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.read_pos)
    }

    /// Whether every byte of the current chunk has been decoded.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a Big Endian `u16` at the read cursor.
    ///
    /// Returns `None` if fewer than 2 bytes remain.
    pub fn decode_u16(&mut self) -> Option<u16> {
        let mut unread = self.unread();
        if unread.remaining() < 2 {
            return None;
        }
        let value = unread.get_u16();
        self.read_pos += 2;
        Some(value)
    }

    /// Read a length-prefixed string at the read cursor.
    ///
    /// The returned slice borrows the buffer and is valid until the next
    /// mutation. Returns `None` (cursor unchanged) if the declared length
    /// runs past the received bytes.
    pub fn decode_string(&mut self) -> Option<&[u8]> {
        let mut unread = self.unread();
        if unread.remaining() < 2 {
            return None;
        }
        let len = unread.get_u16() as usize;
        if unread.remaining() < len {
            return None;
        }
        let start = self.read_pos + 2;
        self.read_pos = start + len;
        Some(&self.data[start..start + len])
    }

    fn unread(&self) -> &[u8] {
        self.data.get(self.read_pos..).unwrap_or(&[])
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("tag", &self.tag())
            .field("len", &self.data.len())
            .field("read_pos", &self.read_pos)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [u8; IDENTITY_LEN] = [0xAA; IDENTITY_LEN];

    /// Load raw bytes as if they had been received from the socket.
    fn inbound(bytes: &[u8]) -> MessageBuffer {
        let mut buf = MessageBuffer::new();
        buf.fill_from(|dst| -> Result<usize, ()> {
            dst[..bytes.len()].copy_from_slice(bytes);
            Ok(bytes.len())
        })
        .unwrap();
        buf
    }

    #[test]
    fn test_begin_writes_tag_and_identity() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);

        assert_eq!(buf.len(), 17);
        assert_eq!(buf.tag(), Some(0x02));
        assert_eq!(&buf.as_bytes()[1..], &IDENTITY);
        assert!(!buf.is_terminal());
        assert!(!buf.is_inbound());
    }

    #[test]
    fn test_encode_u16_big_endian() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        assert!(buf.encode_u16(0x0102));
        assert_eq!(&buf.as_bytes()[17..], &[0x01, 0x02]);
    }

    #[test]
    fn test_encode_string_length_prefix() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        assert!(buf.encode_string(b"abc"));
        assert_eq!(&buf.as_bytes()[17..], &[0x00, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_encode_empty_string() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        assert!(buf.encode_string(b""));
        assert_eq!(&buf.as_bytes()[17..], &[0x00, 0x00]);
    }

    #[test]
    fn test_encode_string_too_long_writes_nothing() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        let huge = vec![b'x'; MAX_STRING_LEN + 1];

        assert!(!buf.encode_string(&huge));
        assert_eq!(buf.len(), 17, "no wrapped length prefix may be written");
    }

    #[test]
    fn test_encode_string_overflowing_message_writes_nothing() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        // Fits the length prefix but not the message size.
        let big = vec![b'x'; MAX_MESSAGE_SIZE];

        assert!(!buf.encode_string(&big));
        assert_eq!(buf.len(), 17);
    }

    #[test]
    fn test_encode_fills_message_exactly() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        let exact = vec![b'x'; MAX_MESSAGE_SIZE - 17 - 2];

        assert!(buf.encode_string(&exact));
        assert_eq!(buf.len(), MAX_MESSAGE_SIZE);
        assert_eq!(buf.available(), 0);
        assert!(!buf.encode_u16(1));
        assert!(!buf.encode_string(b""));
    }

    #[test]
    fn test_mark_terminal() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x06, &IDENTITY);
        buf.mark_terminal();
        assert_eq!(buf.tag(), Some(0x86));
        assert!(buf.is_terminal());
    }

    #[test]
    fn test_truncate_rolls_back() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);
        let mark = buf.len();
        buf.encode_string(b"partial");
        buf.truncate(mark);
        assert_eq!(buf.len(), 17);
    }

    #[test]
    fn test_fill_from_sets_read_cursor_after_tag() {
        let buf = inbound(&[0x81, 0x00, 0x05]);

        assert!(buf.is_inbound());
        assert!(buf.is_terminal());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.remaining(), 2);
    }

    #[test]
    fn test_fill_from_error_clears_buffer() {
        let mut buf = MessageBuffer::new();
        buf.begin(0x02, &IDENTITY);

        let result = buf.fill_from(|_| Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(buf.is_empty());
        assert!(!buf.is_inbound());
    }

    #[test]
    fn test_decode_u16() {
        let mut buf = inbound(&[0x97, 0x12, 0x34]);
        assert_eq!(buf.decode_u16(), Some(0x1234));
        assert!(buf.is_exhausted());
        assert_eq!(buf.decode_u16(), None);
    }

    #[test]
    fn test_decode_u16_truncated() {
        let mut buf = inbound(&[0x97, 0x12]);
        assert_eq!(buf.decode_u16(), None);
        assert_eq!(buf.remaining(), 1);
    }

    #[test]
    fn test_decode_consecutive_strings() {
        let mut buf = inbound(&[0x88, 0, 2, b'h', b'i', 0, 0, 0, 1, b'!']);

        assert_eq!(buf.decode_string(), Some(&b"hi"[..]));
        assert_eq!(buf.decode_string(), Some(&b""[..]));
        assert_eq!(buf.decode_string(), Some(&b"!"[..]));
        assert!(buf.is_exhausted());
    }

    #[test]
    fn test_decode_string_declared_length_past_end() {
        let mut buf = inbound(&[0x88, 0x00, 0x10, b'a', b'b']);

        assert_eq!(buf.decode_string(), None);
        assert_eq!(buf.remaining(), 4, "cursor must not move on failure");
    }

    #[test]
    fn test_tag_only_chunk_is_exhausted() {
        let buf = inbound(&[0x85]);
        assert!(buf.is_exhausted());
    }

    #[test]
    fn test_clear_resets_direction() {
        let mut buf = inbound(&[0x85]);
        buf.clear();
        assert!(buf.is_empty());
        assert!(!buf.is_inbound());
        assert_eq!(buf.tag(), None);
    }
}
