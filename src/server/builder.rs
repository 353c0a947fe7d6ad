//! Builder pattern for server configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use pairchat::ChatServer;
//!
//! # async fn example() -> pairchat::Result<()> {
//! let server = ChatServer::builder()
//!     .port(8080)
//!     .path("/chat")
//!     .allow_origin("https://chat.example")
//!     .reconnect_window(Duration::from_secs(30))
//!     .bind()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

use super::core::ChatServer;
use super::options::ServerOptions;
use super::origin::OriginPolicy;

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for a [`ChatServer`].
///
/// Use [`ChatServer::builder()`] to create one.
#[derive(Debug, Default, Clone)]
pub struct ServerBuilder {
    /// Options under construction.
    options: ServerOptions,
    /// Origins added one at a time; validated in `build`.
    allowed_origins: Vec<String>,
}

// ============================================================================
// ServerBuilder Implementation
// ============================================================================

impl ServerBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.options.bind_ip = ip;
        self
    }

    /// Sets the port (0 for random).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Sets the endpoint path.
    #[inline]
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.options.path = path.into();
        self
    }

    /// Adds an allowed origin, switching the policy to an allow-list.
    #[inline]
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Accepts every origin.
    #[inline]
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.allowed_origins.clear();
        self.options.origins = OriginPolicy::Any;
        self
    }

    /// Sets how long a broken pair can be restored.
    #[inline]
    #[must_use]
    pub fn reconnect_window(mut self, window: Duration) -> Self {
        self.options.engine.reconnect_window = Some(window);
        self
    }

    /// Leaves the remaining side open when its partner disconnects.
    #[inline]
    #[must_use]
    pub fn keep_orphaned_partner(mut self) -> Self {
        self.options.engine.close_orphaned_partner = false;
        self
    }

    /// Validates and returns the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the path or an
    /// origin is invalid.
    pub fn build(self) -> Result<ServerOptions> {
        let mut options = self.options;

        if !self.allowed_origins.is_empty() {
            options.origins = OriginPolicy::allow(&self.allowed_origins)?;
        }

        options.validated()
    }

    /// Validates the options and binds the server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the options are invalid
    /// - [`Error::Io`](crate::Error::Io) if binding fails
    pub async fn bind(self) -> Result<Arc<ChatServer>> {
        ChatServer::bind(self.build()?).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    #[test]
    fn test_default_build() {
        let options = ServerBuilder::new().build().expect("valid");
        assert_eq!(options, ServerOptions::default());
    }

    #[test]
    fn test_setters() {
        let options = ServerBuilder::new()
            .port(9000)
            .path("/pair")
            .allow_origin("https://chat.example")
            .reconnect_window(Duration::from_secs(5))
            .keep_orphaned_partner()
            .build()
            .expect("valid");

        assert_eq!(options.port, 9000);
        assert_eq!(options.path, "/pair");
        assert_eq!(
            options.origins,
            OriginPolicy::Allow(vec!["https://chat.example".into()])
        );
        assert_eq!(options.engine.reconnect_window, Some(Duration::from_secs(5)));
        assert!(!options.engine.close_orphaned_partner);
    }

    #[test]
    fn test_allow_any_resets_list() {
        let options = ServerBuilder::new()
            .allow_origin("https://chat.example")
            .allow_any_origin()
            .build()
            .expect("valid");

        assert_eq!(options.origins, OriginPolicy::Any);
    }

    #[test]
    fn test_invalid_path() {
        let err = ServerBuilder::new().path("chat").build().expect_err("invalid");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_origin() {
        let err = ServerBuilder::new()
            .allow_origin("not a url")
            .build()
            .expect_err("invalid");
        assert!(matches!(err, Error::Config { .. }));
    }
}
