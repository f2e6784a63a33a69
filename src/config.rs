//! Client configuration: service endpoint, receive timeout and identity.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::protocol::IDENTITY_LEN;

/// Abstract socket name the service listens on.
pub const DEFAULT_SERVICE_NAME: &str = "transformer";

/// Default time a receive may block before the connection is given up.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the service can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Linux abstract Unix socket address (no filesystem entry).
    Abstract(String),
    /// Filesystem Unix socket path.
    Path(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Abstract(DEFAULT_SERVICE_NAME.to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Abstract(name) => write!(f, "@{}", name),
            Endpoint::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 16-byte token identifying the caller towards the service.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Generate a fresh identity from the OS random source.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Use caller-provided bytes; they must be exactly 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; IDENTITY_LEN] = bytes.try_into().map_err(|_| {
            ClientError::InvalidArgument(format!(
                "bad UUID: expected {} bytes, got {}",
                IDENTITY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw identity bytes as sent on the wire.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", Uuid::from_bytes(self.0))
    }
}

/// Settings used when creating a context.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service address.
    pub endpoint: Endpoint,
    /// Maximum time a single receive may block.
    pub receive_timeout: Duration,
    /// Identity to use; generated when `None`.
    pub identity: Option<Identity>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            identity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint,
            Endpoint::Abstract("transformer".to_string())
        );
        assert_eq!(config.receive_timeout, Duration::from_secs(60));
        assert!(config.identity.is_none());
    }

    #[test]
    fn test_identity_from_slice() {
        let bytes: Vec<u8> = (0u8..16).collect();
        let identity = Identity::from_slice(&bytes).unwrap();
        assert_eq!(&identity.as_bytes()[..], &bytes[..]);
    }

    #[test]
    fn test_identity_wrong_length_rejected() {
        let err = Identity::from_slice(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(Identity::from_slice(&[0; 17]).is_err());
        assert!(Identity::from_slice(&[]).is_err());
    }

    #[test]
    fn test_generated_identities_differ() {
        assert_ne!(Identity::generate(), Identity::generate());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::default().to_string(), "@transformer");
        assert_eq!(
            Endpoint::Path(PathBuf::from("/run/svc.sock")).to_string(),
            "/run/svc.sock"
        );
    }
}
