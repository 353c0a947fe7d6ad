//! Chat server options.
//!
//! Options can be built in code or loaded from JSON. Every field has a
//! default, so a config file only needs the fields it changes:
//!
//! ```json
//! {
//!   "bind_ip": "0.0.0.0",
//!   "port": 8080,
//!   "path": "/chat",
//!   "origins": { "allow": ["https://chat.example"] },
//!   "engine": { "reconnect_window_secs": 30 }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::EngineOptions;
use crate::error::{Error, Result};

use super::origin::OriginPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default endpoint path.
pub const DEFAULT_PATH: &str = "/chat";

// ============================================================================
// ServerOptions
// ============================================================================

/// Hosting endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Address to bind.
    pub bind_ip: IpAddr,

    /// Port to bind (0 for random).
    pub port: u16,

    /// Request path the WebSocket endpoint answers on.
    pub path: String,

    /// Allowed handshake origins.
    pub origins: OriginPolicy,

    /// Pairing engine behaviour.
    pub engine: EngineOptions,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_ip: DEFAULT_BIND_IP,
            port: 0,
            path: DEFAULT_PATH.to_owned(),
            origins: OriginPolicy::Any,
            engine: EngineOptions::default(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ServerOptions {
    /// Parses options from a JSON string and validates them.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the JSON is malformed
    /// - [`Error::Config`] if a value is invalid
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str::<Self>(json)?.validated()
    }

    /// Reads options from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] if the JSON is malformed
    /// - [`Error::Config`] if a value is invalid
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Checks the path and normalizes the origin allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path does not start with `/` or an
    /// origin is not a URL with a host.
    pub fn validated(mut self) -> Result<Self> {
        if !self.path.starts_with('/') {
            return Err(Error::config(format!(
                "path must start with '/': {}",
                self.path
            )));
        }

        self.origins = self.origins.validated()?;
        Ok(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let options = ServerOptions::default();
        assert_eq!(options.bind_ip, DEFAULT_BIND_IP);
        assert_eq!(options.port, 0);
        assert_eq!(options.path, "/chat");
        assert_eq!(options.origins, OriginPolicy::Any);
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        let options = ServerOptions::from_json_str("{}").expect("valid");
        assert_eq!(options, ServerOptions::default());
    }

    #[test]
    fn test_full_json() {
        let options = ServerOptions::from_json_str(
            r#"{
                "bind_ip": "0.0.0.0",
                "port": 8080,
                "path": "/random",
                "origins": { "allow": ["https://chat.example/"] },
                "engine": { "reconnect_window_secs": 30, "close_orphaned_partner": false }
            }"#,
        )
        .expect("valid");

        assert_eq!(options.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(options.path, "/random");
        assert_eq!(
            options.origins,
            OriginPolicy::Allow(vec!["https://chat.example".into()])
        );
        assert_eq!(options.engine.reconnect_window, Some(Duration::from_secs(30)));
        assert!(!options.engine.close_orphaned_partner);
    }

    #[test]
    fn test_bad_path_rejected() {
        let err = ServerOptions::from_json_str(r#"{"path": "chat"}"#).expect_err("invalid");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = ServerOptions::from_json_str("{").expect_err("invalid");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerOptions::from_json_file("/nonexistent/pairchat.json").expect_err("missing");
        assert!(matches!(err, Error::Io(_)));
    }
}
