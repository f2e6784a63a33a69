//! Connected Unix datagram socket to the service.
//!
//! Datagrams preserve message boundaries, so one `send` is one request and
//! one `receive` is one response chunk.
//!
//! - Send failures close the socket, reconnect once and resend once.
//! - Receive failures (including the timeout) close the socket; the next
//!   send reconnects lazily.
//! - Interrupted system calls are retried transparently.
//!
//! # Example
//!
//! ```ignore
//! use transformer_client::transport::Connection;
//! use transformer_client::{Endpoint, DEFAULT_RECEIVE_TIMEOUT};
//!
//! let mut conn = Connection::open(Endpoint::default(), DEFAULT_RECEIVE_TIMEOUT)?;
//! conn.send(&request)?;
//! let n = conn.receive(&mut buf)?;
//! ```

use std::io;
use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use crate::config::Endpoint;
use crate::error::{ClientError, Result};

/// Connection to the service that repairs itself lazily before sending.
#[derive(Debug)]
pub struct Connection {
    endpoint: Endpoint,
    receive_timeout: Duration,
    socket: Option<UnixDatagram>,
}

impl Connection {
    /// Connect to the service.
    ///
    /// Unlike later reconnects, failure here is reported to the caller.
    pub fn open(endpoint: Endpoint, receive_timeout: Duration) -> Result<Self> {
        let socket = connect(&endpoint, receive_timeout)?;
        Ok(Self {
            endpoint,
            receive_timeout,
            socket: Some(socket),
        })
    }

    /// Check if a socket is currently held.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// The service address.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one complete message.
    ///
    /// Reconnects first if the connection was closed earlier. If the
    /// transmit fails, the socket is replaced once and the message is sent
    /// again; a second failure leaves the connection closed.
    pub fn send(&mut self, msg: &[u8]) -> Result<()> {
        if self.socket.is_none() {
            tracing::debug!("reconnecting to {} before sending", self.endpoint);
            self.reconnect()?;
        }
        let first = self.transmit(msg);
        let Err(e) = first else {
            return Ok(());
        };
        tracing::error!("send to {} failed: {}", self.endpoint, e);
        self.close();
        tracing::debug!("reconnecting to {} after first send attempt", self.endpoint);
        self.reconnect()?;
        if let Err(e) = self.transmit(msg) {
            tracing::error!("send to {} failed again: {}", self.endpoint, e);
            self.close();
            return Err(e.into());
        }
        Ok(())
    }

    /// Block until one message arrives and copy it into `buf`.
    ///
    /// Returns the datagram size. On timeout or error the connection is
    /// closed; there is no retry.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        let result = loop {
            match socket.recv(buf) {
                // SO_RCVTIMEO sockets are not restarted by SA_RESTART.
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let err = match result {
            Ok(0) => ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "received an empty datagram",
            )),
            Ok(n) => {
                tracing::debug!("received {} bytes", n);
                return Ok(n);
            }
            Err(e) if is_timeout(&e) => {
                tracing::error!("timeout {:?} reached", self.receive_timeout);
                ClientError::ReceiveTimeout(self.receive_timeout)
            }
            Err(e) => {
                tracing::error!("receive error: {}", e);
                ClientError::Io(e)
            }
        };
        tracing::warn!("closing connection due to previous error");
        self.close();
        Err(err)
    }

    /// Drop the socket; the next send reconnects.
    pub fn close(&mut self) {
        self.socket = None;
    }

    fn reconnect(&mut self) -> Result<()> {
        self.socket = Some(connect(&self.endpoint, self.receive_timeout)?);
        Ok(())
    }

    fn transmit(&self, msg: &[u8]) -> io::Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        loop {
            match socket.send(msg) {
                Ok(n) if n == msg.len() => return Ok(()),
                Ok(n) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short datagram write: {} of {} bytes", n, msg.len()),
                    ))
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Create a socket and connect it to the service.
///
/// Sockets created by std are close-on-exec.
fn connect(endpoint: &Endpoint, receive_timeout: Duration) -> Result<UnixDatagram> {
    let socket = UnixDatagram::unbound().map_err(|e| {
        tracing::error!("socket() failed: {}", e);
        e
    })?;

    // Credentials on every datagram; on Linux this also autobinds the socket
    // so the service has an address to reply to.
    if let Err(e) = enable_passcred(&socket) {
        tracing::warn!("could not enable SO_PASSCRED: {}", e);
    }
    socket.set_read_timeout(Some(receive_timeout))?;

    connect_endpoint(&socket, endpoint).map_err(|e| {
        tracing::error!("connect() to {} failed: {}", endpoint, e);
        ClientError::Io(e)
    })?;
    tracing::debug!("connected to {}", endpoint);
    Ok(socket)
}

fn connect_endpoint(socket: &UnixDatagram, endpoint: &Endpoint) -> io::Result<()> {
    match endpoint {
        Endpoint::Path(path) => socket.connect(path),
        Endpoint::Abstract(name) => connect_abstract(socket, name),
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_abstract(socket: &UnixDatagram, name: &str) -> io::Result<()> {
    #[cfg(target_os = "android")]
    use std::os::android::net::SocketAddrExt;
    #[cfg(target_os = "linux")]
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    socket.connect_addr(&addr)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(_socket: &UnixDatagram, name: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("abstract socket address @{} needs Linux", name),
    ))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn enable_passcred(socket: &UnixDatagram) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let on: libc::c_int = 1;
    // SAFETY: the fd is owned by `socket` and stays open for the call; the
    // option pointer and length describe a live `c_int`.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_PASSCRED,
            &on as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn enable_passcred(_socket: &UnixDatagram) -> io::Result<()> {
    Ok(())
}
