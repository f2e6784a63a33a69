//! Client context and builder.
//!
//! A [`Context`] owns one connection, one message buffer and one identity.
//! It drives one request/response cycle at a time:
//! 1. Stage request items with [`Context::fill_request`]
//! 2. Call [`Context::next_response`] until it returns `None`; the first call
//!    sends the request
//! 3. Start over with new items, or drop the context
//!
//! # Example
//!
//! ```no_run
//! use transformer_client::{Context, Request, Response};
//!
//! let mut ctx = Context::new()?;
//! ctx.fill_request(&Request::GetValues { path: "InternetGatewayDevice." })?;
//! while let Some(resp) = ctx.next_response(false) {
//!     match resp {
//!         Response::Value(v) => println!("{}{}={} ({})", v.partial_path, v.param, v.value, v.param_type),
//!         Response::Error { code, message } => println!("** Error ** {}: {}", code, message),
//!         _ => {}
//!     }
//! }
//! # Ok::<(), transformer_client::ClientError>(())
//! ```

use std::time::Duration;

use crate::config::{ClientConfig, Endpoint, Identity};
use crate::error::{ClientError, Result};
use crate::protocol::{MessageBuffer, Request, RequestKind, Response, MAX_MESSAGE_SIZE};
use crate::stream::{self, Phase, Step};
use crate::transport::Connection;

/// Builder for configuring and connecting a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ClientConfig,
}

impl ContextBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service address.
    ///
    /// Default: abstract socket `@transformer`
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Set how long a receive may block.
    ///
    /// Must be non-zero; `connect` rejects a zero timeout.
    ///
    /// Default: 60 seconds
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    /// Use a fixed identity instead of a generated one.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.config.identity = Some(identity);
        self
    }

    /// Use caller-provided identity bytes; they must be exactly 16 bytes.
    pub fn identity_bytes(self, bytes: &[u8]) -> Result<Self> {
        Ok(self.identity(Identity::from_slice(bytes)?))
    }

    /// Connect to the service and create the context.
    pub fn connect(self) -> Result<Context> {
        Context::with_config(self.config)
    }
}

/// One connection to the service.
///
/// Not meant for concurrent use; independent contexts share nothing.
#[derive(Debug)]
pub struct Context {
    identity: Identity,
    conn: Connection,
    buffer: MessageBuffer,
    /// Kind of the staged (or in-flight) request.
    pending: Option<RequestKind>,
    phase: Phase,
}

impl Context {
    /// Connect with default settings and a generated identity.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a builder.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Connect using the given configuration.
    ///
    /// Fails if the receive timeout is zero or the service cannot be reached.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        if config.receive_timeout.is_zero() {
            return Err(ClientError::InvalidArgument(
                "receive timeout must be non-zero".to_string(),
            ));
        }
        let identity = config.identity.unwrap_or_else(Identity::generate);
        let conn = Connection::open(config.endpoint, config.receive_timeout)?;
        tracing::debug!(?identity, endpoint = %conn.endpoint(), "new context");
        Ok(Self {
            identity,
            conn,
            buffer: MessageBuffer::new(),
            pending: None,
            phase: Phase::Idle,
        })
    }

    /// The identity sent with every request.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Check if the context currently holds a live socket.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Kind of the request being staged or processed, if any.
    pub fn pending_request(&self) -> Option<RequestKind> {
        self.pending
    }

    /// Current phase of the request/response cycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Add a request item.
    ///
    /// Items of the same kind are batched. An item of a different kind
    /// discards whatever was staged before. Apply, AddObject and
    /// DeleteObject allow only one item per request.
    ///
    /// If the item does not fit, `ResourceExceeded` is returned and the
    /// staged request is left exactly as it was before the call.
    pub fn fill_request(&mut self, item: &Request<'_>) -> Result<()> {
        let kind = item.kind();
        if self.phase.in_flight() || self.pending.map_or(false, |p| p != kind) {
            tracing::debug!(
                "a previous request {:?} is still pending; resetting to {}",
                self.pending,
                kind
            );
            self.reset_request();
        }

        let fresh = self.pending.is_none();
        if !fresh && kind.is_singleton() {
            tracing::error!("only one {} request item is possible in a request", kind);
            return Err(ClientError::InvalidArgument(format!(
                "only one {} item per request",
                kind
            )));
        }
        if fresh {
            self.buffer
                .begin(kind.message_type().as_u8(), self.identity.as_bytes());
        }

        let mark = self.buffer.len();
        if !item.encode_fields(&mut self.buffer) {
            if fresh {
                self.buffer.clear();
            } else {
                self.buffer.truncate(mark);
            }
            tracing::error!("{} item does not fit in a {} byte message", kind, MAX_MESSAGE_SIZE);
            return Err(ClientError::ResourceExceeded {
                max: MAX_MESSAGE_SIZE,
            });
        }
        tracing::debug!(?item, "filled");
        self.pending = Some(kind);
        Ok(())
    }

    /// Discard the staged request and any response still in flight.
    ///
    /// Remaining chunks of an unfinished response are read and dropped so the
    /// connection is ready for the next request.
    pub fn reset_request(&mut self) {
        if self.phase.in_flight() {
            stream::drain(&mut self.buffer, &mut self.conn);
        }
        self.buffer.clear();
        self.pending = None;
        self.phase = Phase::Idle;
    }

    /// Get the next response, sending the request first if needed.
    ///
    /// Returns `None` when there are no further responses or something went
    /// wrong; either way the request is cleared and new items must be filled.
    /// With `stop` set, the request is still sent if it was not yet, but all
    /// responses are discarded.
    pub fn next_response(&mut self, stop: bool) -> Option<Response> {
        match self.try_next_response(stop) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("response stream ended: {}", e);
                None
            }
        }
    }

    /// Like [`Context::next_response`], but reports why the cycle ended.
    ///
    /// `Ok(None)` means the response is complete (or nothing was staged).
    /// On `Err` the context has already been reset.
    pub fn try_next_response(&mut self, stop: bool) -> Result<Option<Response>> {
        if self.phase == Phase::Idle {
            let Some(kind) = self.pending else {
                tracing::warn!("no request");
                return Ok(None);
            };
            if let Err(e) = self.send() {
                self.reset_request();
                return Err(e);
            }
            if kind.expects_response() {
                if let Err(e) = stream::receive_chunk(&mut self.buffer, &mut self.conn) {
                    self.reset_request();
                    return Err(e);
                }
                self.phase = Phase::Streaming { produced: 0 };
            } else if !stop {
                self.phase = Phase::Done;
                return Ok(Some(Response::Empty));
            }
        }

        let produced = match self.phase {
            Phase::Streaming { produced } if !stop => produced,
            _ => {
                tracing::debug!("we're done");
                self.reset_request();
                return Ok(None);
            }
        };

        match stream::next_step(&mut self.buffer, &mut self.conn, produced) {
            Ok(Step::Item(resp)) => {
                self.phase = Phase::Streaming {
                    produced: produced + 1,
                };
                Ok(Some(resp))
            }
            Ok(Step::Empty) => {
                self.phase = Phase::Done;
                Ok(Some(Response::Empty))
            }
            Ok(Step::End) => {
                tracing::debug!("we're done");
                self.reset_request();
                Ok(None)
            }
            Err(e) => {
                self.reset_request();
                Err(e)
            }
        }
    }

    /// Iterate over the remaining responses of the current request.
    pub fn responses(&mut self) -> Responses<'_> {
        Responses { ctx: self }
    }

    fn send(&mut self) -> Result<()> {
        self.buffer.mark_terminal();
        self.conn.send(self.buffer.as_bytes())?;
        self.phase = Phase::Sent;
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        tracing::debug!(identity = ?self.identity, "dropping context");
        if self.conn.is_connected() {
            self.reset_request();
        }
    }
}

/// Iterator over responses, see [`Context::responses`].
#[derive(Debug)]
pub struct Responses<'a> {
    ctx: &'a mut Context,
}

impl Iterator for Responses<'_> {
    type Item = Response;

    fn next(&mut self) -> Option<Response> {
        self.ctx.next_response(false)
    }
}
