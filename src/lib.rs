//! # transformer-client
//!
//! Rust client SDK for the Transformer configuration service.
//!
//! The service is reached over a local Unix datagram socket and speaks a
//! small length-prefixed binary protocol: the client sends one request (a
//! batch of items of the same kind) and reads a stream of response items,
//! possibly spread over several datagrams, until the final chunk.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): wire codec, request encoding, response decoding
//! - **Transport** ([`transport`]): connect, send, receive, lazy reconnect
//! - **Context** ([`Context`]): one buffer, one connection, one identity,
//!   one request/response cycle at a time
//!
//! ## Example
//!
//! ```no_run
//! use transformer_client::{Context, Request, Response};
//!
//! let mut ctx = Context::builder()
//!     .identity_bytes(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15])?
//!     .connect()?;
//!
//! for (path, value) in [
//!     ("InternetGatewayDevice.ManagementServer.Username", "new_username"),
//!     ("InternetGatewayDevice.ManagementServer.Password", "new_password"),
//! ] {
//!     ctx.fill_request(&Request::SetValues { full_path: path, value })?;
//! }
//! for resp in ctx.responses() {
//!     match resp {
//!         Response::Empty => println!("SPV succeeded"),
//!         Response::SetError { full_path, code, message } => {
//!             println!("{}: {} ({})", full_path, message, code)
//!         }
//!         _ => {}
//!     }
//! }
//!
//! // Send the apply; not interested in the result.
//! ctx.fill_request(&Request::Apply)?;
//! ctx.next_response(true);
//! # Ok::<(), transformer_client::ClientError>(())
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

mod client;
mod stream;

pub use client::{Context, ContextBuilder, Responses};
pub use config::{ClientConfig, Endpoint, Identity, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_SERVICE_NAME};
pub use error::{ClientError, Result};
pub use protocol::{ParamType, Request, RequestKind, Response, ValueEntry, IDENTITY_LEN};
pub use stream::Phase;

/// Version of the client protocol engine (0.0.2).
pub const VERSION: u32 = 0x000002;

/// Version of the library you're running against.
pub fn version() -> u32 {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), 2);
        assert_eq!(VERSION, 0x000002);
    }
}
