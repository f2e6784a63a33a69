//! Transport module - connection to the service.
//!
//! Provides a blocking, message-preserving Unix datagram connection with:
//! - Abstract (Linux) or filesystem socket addresses
//! - Receive timeout
//! - Lazy reconnect before the next send after any failure

mod datagram;

pub use datagram::Connection;
