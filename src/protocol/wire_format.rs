//! Wire format constants and message tags.
//!
//! Every message starts with a single tag byte:
//! ```text
//! ┌──────────┬──────────────────┐
//! │ bit 7    │ bits 0-6         │
//! │ terminal │ message type     │
//! └──────────┴──────────────────┘
//! ```
//!
//! Requests continue with the 16-byte identity followed by the
//! item fields; responses continue directly with the item fields.
//! All multi-byte integers are Big Endian.

/// Maximum size of one message, tag byte and identity included (33 KiB).
pub const MAX_MESSAGE_SIZE: usize = 33 * 1024;

/// Capacity of the shared message buffer.
///
/// One spare byte beyond the maximum lets a receive detect oversized datagrams.
pub const BUFFER_CAPACITY: usize = MAX_MESSAGE_SIZE + 1;

/// Length of the identity token in bytes.
pub const IDENTITY_LEN: usize = 16;

/// Longest string a length prefix can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Terminal flag: set on every request, and on the final chunk of a response.
pub const TERMINAL_FLAG: u8 = 0b1000_0000;

/// Mask selecting the message type bits of a tag byte.
pub const TYPE_MASK: u8 = 0b0111_1111;

/// Message types understood by the service.
///
/// The numbering is shared with the service and must not be reordered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Placeholder for an empty message buffer.
    Unknown = 0,
    ErrorResp = 1,
    GpvReq = 2,
    GpvResp = 3,
    SpvReq = 4,
    SpvResp = 5,
    ApplyReq = 6,
    AddReq = 7,
    AddResp = 8,
    DelReq = 9,
    DelResp = 10,
    GpnReq = 11,
    GpnResp = 12,
    ResolveReq = 13,
    ResolveResp = 14,
    SubscribeReq = 15,
    SubscribeResp = 16,
    UnsubscribeReq = 17,
    UnsubscribeResp = 18,
    Event = 19,
    GplReq = 20,
    GplResp = 21,
    GpcReq = 22,
    GpcResp = 23,
}

impl MessageType {
    /// Parse the message type bits of a tag byte.
    ///
    /// The terminal flag is ignored.
    pub fn from_tag(tag: u8) -> Option<Self> {
        use MessageType::*;
        Some(match tag & TYPE_MASK {
            0 => Unknown,
            1 => ErrorResp,
            2 => GpvReq,
            3 => GpvResp,
            4 => SpvReq,
            5 => SpvResp,
            6 => ApplyReq,
            7 => AddReq,
            8 => AddResp,
            9 => DelReq,
            10 => DelResp,
            11 => GpnReq,
            12 => GpnResp,
            13 => ResolveReq,
            14 => ResolveResp,
            15 => SubscribeReq,
            16 => SubscribeResp,
            17 => UnsubscribeReq,
            18 => UnsubscribeResp,
            19 => Event,
            20 => GplReq,
            21 => GplResp,
            22 => GpcReq,
            23 => GpcResp,
            _ => return None,
        })
    }

    /// The raw tag value without the terminal flag.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Check whether a tag byte carries the terminal flag.
#[inline]
pub fn is_terminal(tag: u8) -> bool {
    tag & TERMINAL_FLAG != 0
}

/// Strip the terminal flag from a tag byte.
#[inline]
pub fn type_bits(tag: u8) -> u8 {
    tag & TYPE_MASK
}
