//! Response stream decoding across chunks.
//!
//! A logical response may span several datagrams. Every chunk repeats the
//! response tag; only the last one carries the terminal flag. The state
//! machine per request:
//!
//! ```text
//! Idle ──send──► Sent ──receive──► Streaming ──terminal consumed──► Idle
//!                  │                   │
//!                  │                   ├── failure / stop (drain) ──► Idle
//!                  │                   └── item-less chunk ──► Done
//!                  └── Apply, no reply ──► Done ──next call (drain)──► Idle
//! ```
//!
//! `Done` only means a synthetic `Empty` was handed out and the next call
//! ends the cycle. A consumed terminal chunk does not pass through `Done`:
//! the cycle returns to `Idle` in the same call that reports the end, as do
//! failures and stops.

use crate::error::{ClientError, Result};
use crate::protocol::{decode_item, type_bits, MessageBuffer, MessageType, Response};
use crate::transport::Connection;

/// Phase of the current request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request transmitted yet; items may be staged.
    Idle,
    /// Request transmitted, no response decoded yet.
    Sent,
    /// Response items are being produced.
    Streaming {
        /// Items handed out so far.
        produced: usize,
    },
    /// A synthetic `Empty` was handed out; the next call drains whatever
    /// is left of the response and returns to `Idle`.
    ///
    /// Reaching the end of the terminal chunk goes straight to `Idle`
    /// without passing through this phase.
    Done,
}

impl Phase {
    /// Whether a request has been sent and its cycle is not finished.
    #[inline]
    pub fn in_flight(self) -> bool {
        self != Phase::Idle
    }
}

/// What the next decode step produced.
#[derive(Debug)]
pub(crate) enum Step {
    /// One more item; more may follow.
    Item(Response),
    /// An item-less response: the request succeeded with nothing to return.
    Empty,
    /// Terminal chunk fully consumed.
    End,
}

/// Decode the next item, receiving further chunks while the current one is
/// exhausted and not terminal.
///
/// `produced` is the number of items already handed out for this response.
pub(crate) fn next_step(
    buf: &mut MessageBuffer,
    conn: &mut Connection,
    produced: usize,
) -> Result<Step> {
    loop {
        if !buf.is_exhausted() {
            break;
        }
        // Only a tag byte and nothing produced yet: nothing to report.
        if produced == 0 && buf.len() == 1 {
            return Ok(Step::Empty);
        }
        if buf.is_terminal() {
            return Ok(Step::End);
        }

        let expected = current_type(buf);
        receive_chunk(buf, conn)?;
        let got = current_type(buf);
        if got != expected {
            return Err(ClientError::Protocol(format!(
                "unexpected response type {}, expected {}",
                got, expected
            )));
        }
    }

    let tag = buf.tag().unwrap_or_default();
    let msg_type = MessageType::from_tag(tag).ok_or_else(|| {
        ClientError::Protocol(format!("unknown response type {}", type_bits(tag)))
    })?;
    decode_item(buf, msg_type).map(Step::Item)
}

/// Receive one datagram into the shared buffer.
pub(crate) fn receive_chunk(buf: &mut MessageBuffer, conn: &mut Connection) -> Result<usize> {
    let n = buf.fill_from(|dst| conn.receive(dst))?;
    if n > crate::protocol::MAX_MESSAGE_SIZE {
        return Err(ClientError::Protocol(format!(
            "response of {} bytes exceeds the maximum message size",
            n
        )));
    }
    Ok(n)
}

/// Receive and discard the rest of an abandoned response.
///
/// Stops at the terminal chunk or at the first receive failure, so the
/// connection is never left mid-stream for the next request.
pub(crate) fn drain(buf: &mut MessageBuffer, conn: &mut Connection) {
    if !buf.is_inbound() {
        return;
    }
    while !buf.is_terminal() {
        tracing::debug!("discarding response");
        match receive_chunk(buf, conn) {
            Ok(_) => {}
            // oversized chunk was still consumed from the socket
            Err(ClientError::Protocol(_)) => {}
            Err(_) => break,
        }
    }
}

fn current_type(buf: &MessageBuffer) -> u8 {
    buf.tag().map_or(0, type_bits)
}
