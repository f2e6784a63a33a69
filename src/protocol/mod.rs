//! Protocol module - wire format, message buffer, request and response items.
//!
//! This module implements the wire codec:
//! - Tag byte with terminal flag, Big Endian `u16` integers
//! - Length-prefixed strings (`u16` length, raw bytes)
//! - Request item encoding and response item decoding
//!
//! Nothing in here performs I/O.

mod buffer;
mod request;
mod response;
mod wire_format;

pub use buffer::MessageBuffer;
pub use request::{Request, RequestKind};
pub use response::{ParamType, Response, ValueEntry};
pub use wire_format::{
    is_terminal, type_bits, MessageType, BUFFER_CAPACITY, IDENTITY_LEN, MAX_MESSAGE_SIZE,
    MAX_STRING_LEN, TERMINAL_FLAG, TYPE_MASK,
};

pub(crate) use response::decode_item;
