//! In-process fake service for integration tests.
//!
//! Binds a Unix datagram socket in a temporary directory and answers each
//! incoming request with the next scripted list of datagrams. Requests beyond
//! the script are recorded but not answered.

#![allow(dead_code)]

use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tempfile::TempDir;
use transformer_client::{Context, Endpoint};

pub const TYPE_ERROR: u8 = 1;
pub const TYPE_GPV: u8 = 3;
pub const TYPE_SPV: u8 = 5;
pub const TYPE_ADD: u8 = 8;
pub const TYPE_DEL: u8 = 10;
pub const TYPE_GPC: u8 = 23;

pub const IDENTITY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

pub struct FakeService {
    _dir: TempDir,
    path: PathBuf,
    requests: mpsc::Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeService {
    /// Start serving; `script[i]` is the list of datagrams sent back for the
    /// i-th request.
    pub fn start(script: Vec<Vec<Vec<u8>>>) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transformer.sock");
        let socket = UnixDatagram::bind(&path).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut script = script.into_iter();
            let mut buf = vec![0u8; 64 * 1024];
            while !stop_flag.load(Ordering::SeqCst) {
                let (n, addr) = match socket.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(e)
                        if matches!(
                            e.kind(),
                            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                        ) =>
                    {
                        continue
                    }
                    Err(_) => break,
                };
                let _ = tx.send(buf[..n].to_vec());
                for reply in script.next().unwrap_or_default() {
                    let _ = socket.send_to_addr(&reply, &addr);
                }
            }
        });

        Self {
            _dir: dir,
            path,
            requests: rx,
            stop,
            handle: Some(handle),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Path(self.path.clone())
    }

    /// Connect a context with a short receive timeout and a fixed identity.
    pub fn connect(&self) -> Context {
        self.connect_with_timeout(Duration::from_secs(2))
    }

    pub fn connect_with_timeout(&self, timeout: Duration) -> Context {
        Context::builder()
            .endpoint(self.endpoint())
            .receive_timeout(timeout)
            .identity_bytes(&IDENTITY)
            .unwrap()
            .connect()
            .unwrap()
    }

    /// Next request the service received.
    pub fn next_request(&self) -> Vec<u8> {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("service received no request")
    }

    /// Requests received so far and not yet taken.
    pub fn drain_requests(&self) -> Vec<Vec<u8>> {
        self.requests.try_iter().collect()
    }

    /// Close the service socket; its path then refuses connections.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Build one response chunk.
pub fn chunk(msg_type: u8, terminal: bool, items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![if terminal { msg_type | 0x80 } else { msg_type }];
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

pub fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

pub fn value_item(partial_path: &str, param: &str, value: &str, type_name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for s in [partial_path, param, value, type_name] {
        put_str(&mut out, s);
    }
    out
}

pub fn error_item(code: u16, message: &str) -> Vec<u8> {
    let mut out = code.to_be_bytes().to_vec();
    put_str(&mut out, message);
    out
}

pub fn set_error_item(code: u16, full_path: &str, message: &str) -> Vec<u8> {
    let mut out = code.to_be_bytes().to_vec();
    put_str(&mut out, full_path);
    put_str(&mut out, message);
    out
}

/// Expected request bytes: tag with terminal flag, identity, then fields.
pub fn request_bytes(msg_type: u8, fields: &[&str]) -> Vec<u8> {
    let mut out = vec![msg_type | 0x80];
    out.extend_from_slice(&IDENTITY);
    for field in fields {
        put_str(&mut out, field);
    }
    out
}
